//! Poll session driver.
//!
//! A session owns one state cell and two tasks: the driver, which runs the
//! completion checks and the completion staging, and the progress animation.
//! Both mutate state only through [`Shared::update`], which refuses to touch
//! anything once the session's cancellation token has fired.

use std::sync::Arc;
use std::time::Duration;

use aivis_core::{CompletionChecker, FailureReason, JobProgress, SnapshotError, SnapshotSource};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::observer::SessionObserver;
use crate::settings::PollSettings;
use crate::state::SessionState;

struct Shared {
    job_id: String,
    state: Mutex<SessionState>,
    cancel: CancellationToken,
    observer: Arc<dyn SessionObserver>,
}

impl Shared {
    /// Runs `f` against the state unless the session was torn down. The
    /// observer is notified when `f` reports a change (`Some`).
    async fn update<T>(&self, f: impl FnOnce(&mut SessionState) -> Option<T>) -> Option<T> {
        let mut state = self.state.lock().await;
        if self.cancel.is_cancelled() {
            return None;
        }
        let out = f(&mut state);
        if out.is_some() {
            self.observer.on_change(&state);
        }
        out
    }

    async fn apply(&self, f: impl FnOnce(&mut SessionState) -> bool) -> bool {
        self.update(|state| f(state).then_some(())).await.is_some()
    }

    /// Sleeps for `duration`; returns `false` if the session was torn down first.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}

/// Entry point for starting poll sessions.
pub struct PollSession;

impl PollSession {
    /// Starts polling `job_id` on the current tokio runtime.
    ///
    /// The session runs until it succeeds, fails, or the returned handle is
    /// torn down or dropped.
    pub fn start<C, S>(
        job_id: impl Into<String>,
        settings: PollSettings,
        checker: Arc<C>,
        source: Arc<S>,
        observer: Arc<dyn SessionObserver>,
    ) -> PollHandle
    where
        C: CompletionChecker + 'static,
        S: SnapshotSource + 'static,
    {
        let shared = Arc::new(Shared {
            job_id: job_id.into(),
            state: Mutex::new(SessionState::new()),
            cancel: CancellationToken::new(),
            observer,
        });

        tracing::info!(job_id = %shared.job_id, "starting poll session");
        let driver = tokio::spawn(drive(Arc::clone(&shared), settings, checker, source));

        PollHandle {
            shared,
            driver: Some(driver),
        }
    }
}

/// Owner's handle on a running session. Dropping it tears the session down.
///
/// Dropping only cancels; it cannot wait for the state lock. A change already
/// holding the lock on another worker may still land and notify the observer
/// after the drop. Call [`PollHandle::teardown`] when no change may follow.
pub struct PollHandle {
    shared: Arc<Shared>,
    driver: Option<JoinHandle<()>>,
}

impl PollHandle {
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.shared.job_id
    }

    /// Current state snapshot.
    pub async fn state(&self) -> SessionState {
        self.shared.state.lock().await.clone()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    /// Cancels every timer and pending delay of the session.
    ///
    /// Takes the state lock before cancelling, so once this returns no
    /// further state change can happen, including from a check or snapshot
    /// request that was already in flight.
    pub async fn teardown(&self) {
        let _state = self.shared.state.lock().await;
        self.shared.cancel.cancel();
        tracing::debug!(job_id = %self.shared.job_id, "poll session torn down");
    }

    /// Waits for the driver to finish and returns the final state.
    pub async fn wait(&mut self) -> SessionState {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::error!(job_id = %self.shared.job_id, error = %e, "poll driver task failed");
            }
        }
        self.state().await
    }
}

impl Drop for PollHandle {
    /// Best-effort cancellation; see [`PollHandle::teardown`] for the strict form.
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

async fn drive<C, S>(
    shared: Arc<Shared>,
    settings: PollSettings,
    checker: Arc<C>,
    source: Arc<S>,
) where
    C: CompletionChecker + 'static,
    S: SnapshotSource + 'static,
{
    let animation_stop = shared.cancel.child_token();
    // The animation never outlives the driver, whichever way it exits.
    let _animation_guard = animation_stop.clone().drop_guard();
    tokio::spawn(animate(
        Arc::clone(&shared),
        animation_stop.clone(),
        settings.animation_tick,
        settings.animation_step,
    ));

    if !shared.sleep(settings.initial_delay).await {
        return;
    }

    loop {
        let Some(attempt) = shared.update(SessionState::begin_attempt).await else {
            return;
        };

        let result = tokio::select! {
            biased;
            () = shared.cancel.cancelled() => return,
            result = checker.check_progress(&shared.job_id) => result,
        };

        // Completion is decided from the counts, never from the flag alone.
        let result = result.map(|reported| {
            if !reported.is_consistent() {
                tracing::warn!(
                    job_id = %shared.job_id,
                    attempt,
                    processed = reported.processed_units,
                    total = reported.total_units,
                    all_processed = reported.all_processed,
                    "completion flag disagrees with counts; using counts"
                );
            }
            JobProgress::new(reported.processed_units, reported.total_units)
        });

        match result {
            Ok(progress) if progress.all_processed => {
                animation_stop.cancel();
                tracing::info!(
                    job_id = %shared.job_id,
                    attempt,
                    total = progress.total_units,
                    "all prompts processed"
                );
                complete(&shared, &settings, source.as_ref()).await;
                return;
            }
            Ok(progress) => {
                tracing::debug!(
                    job_id = %shared.job_id,
                    attempt,
                    processed = progress.processed_units,
                    total = progress.total_units,
                    "completion check"
                );
                shared.apply(|state| state.record_progress(&progress)).await;
            }
            Err(err) => {
                tracing::warn!(
                    job_id = %shared.job_id,
                    attempt,
                    max_attempts = settings.max_attempts,
                    error = %err,
                    "completion check failed; will retry"
                );
            }
        }

        if attempt >= settings.max_attempts {
            animation_stop.cancel();
            tracing::warn!(job_id = %shared.job_id, attempt, "attempt cap reached");
            shared.apply(|state| state.fail(FailureReason::Timeout)).await;
            return;
        }

        if !shared.sleep(settings.check_interval).await {
            return;
        }
    }
}

/// The one-shot completion staging: 95, settle delay, 98, snapshot, 100.
async fn complete<S: SnapshotSource>(shared: &Shared, settings: &PollSettings, source: &S) {
    if !shared.apply(SessionState::begin_completion).await {
        return;
    }
    if !shared.sleep(settings.settle_delay).await {
        return;
    }
    if !shared.apply(SessionState::settle).await {
        return;
    }

    let result = tokio::select! {
        biased;
        () = shared.cancel.cancelled() => return,
        result = source.ranking_snapshot(&shared.job_id) => result,
    };

    match result {
        Ok(snapshot) => {
            shared.apply(|state| state.succeed(snapshot)).await;
        }
        Err(err) => {
            if matches!(err, SnapshotError::NotReady(_)) {
                tracing::error!(
                    job_id = %shared.job_id,
                    error = %err,
                    "ranking reported not ready after completion"
                );
            } else {
                tracing::warn!(job_id = %shared.job_id, error = %err, "ranking snapshot failed");
            }
            shared.apply(|state| state.fail(err.into())).await;
        }
    }
}

async fn animate(shared: Arc<Shared>, stop: CancellationToken, tick: Duration, step: f64) {
    let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            _ = ticker.tick() => {
                shared.apply(|state| state.animation_tick(step)).await;
            }
        }
    }
}
