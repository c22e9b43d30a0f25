//! Hooks that receive every state change of a poll session.

use tokio::sync::watch;

use crate::state::{Phase, SessionState};

/// Called with the new state after each change, while the session's state
/// lock is held. Implementations must not block.
pub trait SessionObserver: Send + Sync {
    fn on_change(&self, state: &SessionState);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_change(&self, _state: &SessionState) {}
}

/// Logs phase-level changes; animation ticks are logged at `trace`.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    job_id: String,
}

impl TracingObserver {
    #[must_use]
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}

impl SessionObserver for TracingObserver {
    fn on_change(&self, state: &SessionState) {
        match &state.phase {
            Phase::Loading { completing } => tracing::trace!(
                job_id = %self.job_id,
                attempt = state.attempt_count,
                progress = state.displayed_progress,
                completing,
                "poll session progress"
            ),
            Phase::Succeeded(snapshot) => tracing::info!(
                job_id = %self.job_id,
                attempts = state.attempt_count,
                total_mentions = snapshot.total_mentions,
                "poll session succeeded"
            ),
            Phase::Failed(reason) => tracing::warn!(
                job_id = %self.job_id,
                attempts = state.attempt_count,
                reason = %reason,
                "poll session failed"
            ),
        }
    }
}

/// Publishes each state into a `watch` channel for async consumers.
#[derive(Debug)]
pub struct WatchObserver {
    tx: watch::Sender<SessionState>,
}

impl WatchObserver {
    #[must_use]
    pub fn channel() -> (Self, watch::Receiver<SessionState>) {
        let (tx, rx) = watch::channel(SessionState::new());
        (Self { tx }, rx)
    }
}

impl SessionObserver for WatchObserver {
    fn on_change(&self, state: &SessionState) {
        // Receivers may be gone; the session does not care.
        self.tx.send_replace(state.clone());
    }
}
