//! Poll session state and the only functions allowed to change it.
//!
//! Every transition returns `true` when it changed the state. All of them
//! are no-ops once the session has left `Loading`, and the progress
//! animation is a no-op once the completion staging has begun, so the
//! 95 / 98 / 100 sequence can never be overwritten.

use aivis_core::{estimate_progress, status_message, FailureReason, JobProgress, RankingSnapshot};

/// Cap for the animated progress nudges.
const ANIMATION_CEILING: f64 = aivis_core::PROGRESS_CEILING;

pub const PROGRESS_COMPLETING: f64 = 95.0;
pub const PROGRESS_SETTLED: f64 = 98.0;
pub const PROGRESS_DONE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Polling. `completing` flips once, when every unit is first seen
    /// processed; after that only the staging transitions apply.
    Loading { completing: bool },
    Succeeded(RankingSnapshot),
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub attempt_count: u32,
    pub displayed_progress: f64,
    pub status_message: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading { completing: false },
            attempt_count: 0,
            displayed_progress: 0.0,
            status_message: "Starting analysis...".to_string(),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.phase, Phase::Loading { .. })
    }

    /// `true` while polling and before the completion staging began.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        matches!(self.phase, Phase::Loading { completing: false })
    }

    #[must_use]
    pub fn is_completing(&self) -> bool {
        matches!(self.phase, Phase::Loading { completing: true })
    }

    /// Counts a new completion check. Returns the attempt number, or `None`
    /// if the session is no longer polling.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if !self.is_polling() {
            return None;
        }
        self.attempt_count += 1;
        Some(self.attempt_count)
    }

    /// Applies a non-terminal check result. Displayed progress never moves
    /// backwards, so a check below what the animation already reached keeps
    /// the animated value.
    pub fn record_progress(&mut self, progress: &JobProgress) -> bool {
        if !self.is_polling() {
            return false;
        }
        if let Some(estimate) = estimate_progress(progress) {
            self.displayed_progress = self.displayed_progress.max(estimate);
        }
        self.status_message = status_message(progress);
        true
    }

    /// Nudges progress upward for visual continuity between checks.
    pub fn animation_tick(&mut self, step: f64) -> bool {
        if !self.is_polling() || self.displayed_progress >= ANIMATION_CEILING {
            return false;
        }
        self.displayed_progress = (self.displayed_progress + step).min(ANIMATION_CEILING);
        true
    }

    /// One-shot entry into the completion staging. Returns `false` if it
    /// already happened or the session is finished.
    pub fn begin_completion(&mut self) -> bool {
        if !self.is_polling() {
            return false;
        }
        self.phase = Phase::Loading { completing: true };
        self.displayed_progress = PROGRESS_COMPLETING;
        self.status_message = "All prompts analyzed, aggregating results...".to_string();
        true
    }

    /// Marks the settle delay as elapsed.
    pub fn settle(&mut self) -> bool {
        if !self.is_completing() {
            return false;
        }
        self.displayed_progress = PROGRESS_SETTLED;
        self.status_message = "Building your ranking...".to_string();
        true
    }

    pub fn succeed(&mut self, snapshot: RankingSnapshot) -> bool {
        if !self.is_completing() {
            return false;
        }
        self.displayed_progress = PROGRESS_DONE;
        self.status_message = "Analysis complete".to_string();
        self.phase = Phase::Succeeded(snapshot);
        true
    }

    pub fn fail(&mut self, reason: FailureReason) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status_message = reason.to_string();
        self.phase = Phase::Failed(reason);
        true
    }
}
