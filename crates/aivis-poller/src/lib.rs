//! Completion poller for project analysis jobs.
//!
//! Polls a [`CompletionChecker`](aivis_core::CompletionChecker) until every
//! prompt of a project has been analyzed, then fetches the final ranking
//! from a [`SnapshotSource`](aivis_core::SnapshotSource). Progress shown to
//! the user is a blend of the real check results and a slow animation.

pub mod display;
pub mod observer;
pub mod session;
pub mod settings;
pub mod state;

pub use display::{BrandIdentity, RankingDisplay, RankingRow, View};
pub use observer::{NoopObserver, SessionObserver, TracingObserver, WatchObserver};
pub use session::{PollHandle, PollSession};
pub use settings::PollSettings;
pub use state::{Phase, SessionState};
