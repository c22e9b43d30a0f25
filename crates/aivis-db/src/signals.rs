//! Inserts for `mentions` and `citations`, the raw signals every aggregate
//! reads from.

use aivis_core::normalize_platform;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

const UNKNOWN_PLATFORM: &str = "unknown";

/// One entity mention found in an AI answer to a prompt.
///
/// `competitor_id: None` records a mention of the project's own brand.
#[derive(Debug, Clone)]
pub struct NewMention {
    pub prompt_id: i64,
    pub competitor_id: Option<i64>,
    pub platform: String,
    pub region: Option<String>,
    /// In `[-1.000, 1.000]`; `None` when the answer carried no sentiment.
    pub sentiment: Option<Decimal>,
    pub mentioned_at: Option<DateTime<Utc>>,
}

/// One source URL cited by an AI answer.
#[derive(Debug, Clone)]
pub struct NewCitation {
    pub prompt_id: i64,
    pub competitor_id: Option<i64>,
    pub is_brand: bool,
    pub url: String,
    pub domain: String,
    pub platform: String,
    pub region: Option<String>,
    pub cited_at: Option<DateTime<Utc>>,
}

fn stored_platform(raw: &str) -> String {
    normalize_platform(raw).unwrap_or_else(|| UNKNOWN_PLATFORM.to_string())
}

async fn ensure_competitor_in_project(
    pool: &PgPool,
    project_id: i64,
    competitor_id: Option<i64>,
) -> Result<(), DbError> {
    let Some(competitor_id) = competitor_id else {
        return Ok(());
    };

    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM competitors WHERE id = $1 AND project_id = $2)",
    )
    .bind(competitor_id)
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    if owned {
        Ok(())
    } else {
        Err(DbError::ForeignCompetitor {
            project_id,
            competitor_id,
        })
    }
}

/// Record a mention and return its id.
///
/// # Errors
///
/// Returns [`DbError::ForeignCompetitor`] if the competitor belongs to another
/// project, or [`DbError::Sqlx`] if the insert fails.
pub async fn record_mention(
    pool: &PgPool,
    project_id: i64,
    mention: &NewMention,
) -> Result<i64, DbError> {
    ensure_competitor_in_project(pool, project_id, mention.competitor_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO mentions \
             (project_id, prompt_id, competitor_id, platform, region, sentiment, mentioned_at) \
         VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW())) \
         RETURNING id",
    )
    .bind(project_id)
    .bind(mention.prompt_id)
    .bind(mention.competitor_id)
    .bind(stored_platform(&mention.platform))
    .bind(mention.region.as_deref().map(str::to_uppercase))
    .bind(mention.sentiment)
    .bind(mention.mentioned_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Record a citation and return its id. The domain is stored lower-cased.
///
/// # Errors
///
/// Returns [`DbError::ForeignCompetitor`] if the competitor belongs to another
/// project, or [`DbError::Sqlx`] if the insert fails.
pub async fn record_citation(
    pool: &PgPool,
    project_id: i64,
    citation: &NewCitation,
) -> Result<i64, DbError> {
    ensure_competitor_in_project(pool, project_id, citation.competitor_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO citations \
             (project_id, prompt_id, competitor_id, is_brand, url, domain, platform, region, \
              cited_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW())) \
         RETURNING id",
    )
    .bind(project_id)
    .bind(citation.prompt_id)
    .bind(citation.competitor_id)
    .bind(citation.is_brand)
    .bind(&citation.url)
    .bind(citation.domain.trim().to_lowercase())
    .bind(stored_platform(&citation.platform))
    .bind(citation.region.as_deref().map(str::to_uppercase))
    .bind(citation.cited_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
