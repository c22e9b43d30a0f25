//! HTTP client for the aggregation service.
//!
//! Implements the [`CompletionChecker`] and [`SnapshotSource`] contracts over
//! the service's progress and ranking endpoints, with retry on transient
//! failures.

use std::time::Duration;

use aivis_core::{
    CheckError, CompletionChecker, JobProgress, PollConfig, RankingSnapshot, SnapshotError,
    SnapshotSource,
};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::retry::retry_with_backoff;
use crate::types::{ErrorBody, ProgressBody, RankingBody};

const MAX_ERROR_TEXT: usize = 200;

/// Client for the aggregation service REST API.
///
/// Use [`AivisClient::new`] with a loaded [`PollConfig`], or
/// [`AivisClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct AivisClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl AivisClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if the
    /// configured base URL is unusable.
    pub fn new(config: &PollConfig) -> Result<Self, ClientError> {
        Self::with_base_url(
            &config.api_base_url,
            config.api_timeout_secs,
            config.api_max_retries,
            config.api_retry_backoff_ms,
        )
    }

    /// Creates a new client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute http(s) URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("aivis-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(format!(
                "'{base_url}': expected an http or https URL"
            )));
        }

        Ok(Self {
            client,
            base_url: parsed,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetches how many of the project's prompts have been analyzed.
    ///
    /// The `allProcessed` flag is re-derived from the counts; a disagreeing
    /// flag from the wire is logged and ignored.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] on a non-2xx status.
    /// - [`ClientError::Http`] on network failure after retries.
    /// - [`ClientError::Deserialize`] if the body is not a progress object.
    pub async fn fetch_progress(&self, project_id: &str) -> Result<JobProgress, ClientError> {
        let url = self.project_url(project_id, "progress")?;
        let body: ProgressBody = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_json(&url)
        })
        .await?;

        let progress = JobProgress::new(body.processed_prompts, body.total_prompts);
        if body.processed_prompts > body.total_prompts
            || body.all_processed.is_some_and(|flag| flag != progress.all_processed)
        {
            tracing::warn!(
                project_id,
                processed = body.processed_prompts,
                total = body.total_prompts,
                all_processed = ?body.all_processed,
                "inconsistent progress payload, using counts"
            );
        }

        tracing::debug!(
            project_id,
            processed = progress.processed_units,
            total = progress.total_units,
            "completion check"
        );
        Ok(progress)
    }

    /// Fetches the final ranking snapshot and checks its invariants.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] with status 409 when the project is not done,
    ///   404 when there is no data, or 5xx after retries.
    /// - [`ClientError::InvalidSnapshot`] if the snapshot is malformed.
    /// - [`ClientError::Http`] / [`ClientError::Deserialize`] as for
    ///   [`AivisClient::fetch_progress`].
    pub async fn fetch_ranking(&self, project_id: &str) -> Result<RankingSnapshot, ClientError> {
        let url = self.project_url(project_id, "ranking")?;
        let body: RankingBody = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_json(&url)
        })
        .await?;

        let snapshot = match (body.data, body.error) {
            (Some(snapshot), _) => snapshot,
            (None, Some(error)) => return Err(ClientError::InvalidSnapshot(error)),
            (None, None) => {
                return Err(ClientError::InvalidSnapshot(
                    "response carried neither data nor error".to_string(),
                ))
            }
        };

        snapshot
            .validate()
            .map_err(|e| ClientError::InvalidSnapshot(e.to_string()))?;
        Ok(snapshot)
    }

    /// `{base}/api/v1/projects/{project_id}/{leaf}` with the id as a single
    /// escaped path segment.
    fn project_url(&self, project_id: &str, leaf: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v1", "projects", project_id, leaf]);
        Ok(url)
    }

    /// Sends a GET request and parses a 2xx body as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with the service's error text on a non-2xx
    /// status, [`ClientError::Http`] on network failure, or
    /// [`ClientError::Deserialize`] if the body does not match `T`.
    async fn request_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ClientError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| ClientError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

/// Pulls a readable message out of an error response body.
///
/// Understands both the ranking envelope (`error` as a string) and the
/// standard envelope (`error.message`); falls back to the raw text.
fn error_message(text: &str) -> String {
    if let Ok(body) = serde_json::from_str::<RankingBody>(text) {
        if let Some(error) = body.error {
            return error;
        }
    }
    if let Ok(body) = serde_json::from_str::<ErrorBody>(text) {
        return format!("{}: {}", body.error.code, body.error.message);
    }
    text.chars().take(MAX_ERROR_TEXT).collect()
}

impl CompletionChecker for AivisClient {
    async fn check_progress(&self, job_id: &str) -> Result<JobProgress, CheckError> {
        self.fetch_progress(job_id).await.map_err(CheckError::from)
    }
}

impl SnapshotSource for AivisClient {
    async fn ranking_snapshot(&self, job_id: &str) -> Result<RankingSnapshot, SnapshotError> {
        self.fetch_ranking(job_id).await.map_err(SnapshotError::from)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
