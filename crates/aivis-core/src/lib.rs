pub mod aggregate;
pub mod app_config;
pub mod config;
pub mod contracts;
pub mod progress;
pub mod ranking;

pub use aggregate::{
    normalize_platform, rank_citation_domains, rollup_sentiment, CitationDomain, CitationRow,
    EntityKind, QueryFilter, ResolvedFilter, SentimentRollup, SentimentRow,
    DEFAULT_LOOKBACK_DAYS,
};
pub use app_config::{AppConfig, Environment, PollConfig};
pub use config::{load_app_config, load_app_config_from_env, load_poll_config};
pub use contracts::{CheckError, CompletionChecker, FailureReason, SnapshotError, SnapshotSource};
pub use progress::{estimate_progress, status_message, JobProgress, PROGRESS_CEILING};
pub use ranking::{build_ranking_snapshot, Entity, EntityCount, RankingSnapshot};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
