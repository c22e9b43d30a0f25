//! Wire shapes of the aggregation service responses.

use aivis_core::RankingSnapshot;
use serde::Deserialize;

/// Body of the completion check endpoint.
///
/// `allProcessed` is optional on the wire; when present it is cross-checked
/// against the counts.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBody {
    pub processed_prompts: u32,
    pub total_prompts: u32,
    #[serde(default)]
    pub all_processed: Option<bool>,
}

/// Body of the ranking endpoint: `{ "data": ..., "error": ... }`.
#[derive(Debug, Deserialize)]
pub struct RankingBody {
    #[serde(default)]
    pub data: Option<RankingSnapshot>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Standard error envelope: `{ "error": { "code", "message" }, "meta": ... }`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
