//! Collaborator contracts the poller depends on, and the error taxonomy
//! those collaborators report.

use std::future::Future;

use thiserror::Error;

use crate::progress::JobProgress;
use crate::ranking::RankingSnapshot;

/// Failure of a single completion check. Always recoverable by polling again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("completion check failed: {0}")]
    Transient(String),
}

/// Failure to produce a ranking snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The snapshot was requested before every unit finished. The poller
    /// never asks before completion, so seeing this is a contract violation.
    #[error("ranking is not ready: {0}")]
    NotReady(String),

    /// The store has no usable data for the project.
    #[error("{0}")]
    Data(String),

    /// The snapshot service could not be reached or answered garbage.
    #[error("ranking service unavailable: {0}")]
    Unavailable(String),
}

/// Reports how many of a job's background units have completed.
///
/// Implementations must be pure reads: calling twice with no backend change
/// yields the same [`JobProgress`].
pub trait CompletionChecker: Send + Sync {
    fn check_progress(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<JobProgress, CheckError>> + Send;
}

/// Fetches the final ranking once every unit is processed.
pub trait SnapshotSource: Send + Sync {
    fn ranking_snapshot(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<RankingSnapshot, SnapshotError>> + Send;
}

/// Why a poll session ended in failure. Shown to the user as plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The attempt cap was reached without every unit completing.
    Timeout,
    Data(String),
    NotReady(String),
    Unavailable(String),
}

impl From<SnapshotError> for FailureReason {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::NotReady(msg) => FailureReason::NotReady(msg),
            SnapshotError::Data(msg) => FailureReason::Data(msg),
            SnapshotError::Unavailable(msg) => FailureReason::Unavailable(msg),
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::Data(msg) => write!(f, "{msg}"),
            FailureReason::NotReady(msg) => write!(f, "ranking requested before completion: {msg}"),
            FailureReason::Unavailable(msg) => write!(f, "ranking service unavailable: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_displays_as_bare_word() {
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
    }

    #[test]
    fn data_error_message_is_shown_verbatim() {
        let reason = FailureReason::from(SnapshotError::Data("no mentions yet".to_string()));
        assert_eq!(reason.to_string(), "no mentions yet");
    }

    #[test]
    fn not_ready_maps_to_its_own_reason() {
        let reason = FailureReason::from(SnapshotError::NotReady("3/10".to_string()));
        assert!(matches!(reason, FailureReason::NotReady(_)));
    }
}
