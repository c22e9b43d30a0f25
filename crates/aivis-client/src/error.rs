use aivis_core::{CheckError, SnapshotError};
use thiserror::Error;

/// Errors returned by the aggregation service client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A snapshot arrived but breaks the ranking invariants.
    #[error("invalid ranking snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ClientError> for CheckError {
    fn from(err: ClientError) -> Self {
        CheckError::Transient(err.to_string())
    }
}

/// Strips the `code: ` prefix the ranking endpoint puts on its error text.
fn strip_code<'a>(message: &'a str, code: &str) -> &'a str {
    message
        .strip_prefix(code)
        .and_then(|rest| rest.strip_prefix(':'))
        .map_or(message, str::trim_start)
}

impl From<ClientError> for SnapshotError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api {
                status: 409,
                message,
            } => SnapshotError::NotReady(strip_code(&message, "not_ready").to_string()),
            ClientError::Api {
                status: 404,
                message,
            } => SnapshotError::Data(strip_code(&message, "no_data").to_string()),
            ClientError::InvalidSnapshot(message) => SnapshotError::Data(message),
            other => SnapshotError::Unavailable(other.to_string()),
        }
    }
}
