//! Aggregation queries behind the ranking snapshot and analytics reports.
//!
//! Every query scopes to one project and optionally to a [`ResolvedFilter`]
//! (time window, platform, region, topic). Counting happens in SQL; ranking
//! and percentage math is delegated to `aivis-core` so the HTTP and CLI
//! surfaces agree on rounding and tie order.

use aivis_core::{
    build_ranking_snapshot, rank_citation_domains, rollup_sentiment, CitationDomain, CitationRow,
    EntityCount, EntityKind, RankingSnapshot, ResolvedFilter, SentimentRollup, SentimentRow,
    SnapshotError,
};
use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sqlx::PgPool;
use thiserror::Error;

use crate::{progress::check_project_progress, projects::ProjectRow, DbError};

#[derive(Debug, Error)]
pub enum RankingLookupError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Mention counts for the brand and every competitor of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMentionCounts {
    pub brand: EntityCount,
    /// One entry per competitor, including those with zero mentions, in
    /// insertion order.
    pub competitors: Vec<EntityCount>,
}

impl EntityMentionCounts {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.brand.count + self.competitors.iter().map(|c| c.count).sum::<u64>()
    }
}

// ---------------------------------------------------------------------------
// Filter binding
// ---------------------------------------------------------------------------

/// Bind values for the `$2..$6` placeholders produced by [`filter_clause`].
struct FilterBinds<'a> {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    platform: Option<&'a str>,
    region: Option<&'a str>,
    topic: Option<&'a str>,
}

impl<'a> FilterBinds<'a> {
    fn new(filter: Option<&'a ResolvedFilter>) -> Self {
        match filter {
            Some(f) => Self {
                from: Some(f.from),
                to: Some(f.to),
                platform: f.platform.as_deref(),
                region: f.region.as_deref(),
                topic: f.topic.as_deref(),
            },
            None => Self {
                from: None,
                to: None,
                platform: None,
                region: None,
                topic: None,
            },
        }
    }
}

/// `alias` is the signal table (mentions or citations), `time_col` its
/// timestamp column. Expects the prompts table joined as `p`.
fn filter_clause(alias: &str, time_col: &str) -> String {
    format!(
        "($2::timestamptz IS NULL OR {alias}.{time_col} >= $2) \
         AND ($3::timestamptz IS NULL OR {alias}.{time_col} < $3) \
         AND ($4::text IS NULL OR {alias}.platform = $4) \
         AND ($5::text IS NULL OR {alias}.region = $5) \
         AND ($6::text IS NULL OR p.topic = $6)"
    )
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Mention counts and ranking
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct CompetitorCountRow {
    id: i64,
    name: String,
    mentions: i64,
}

/// Count mentions per entity for a project, optionally within `filter`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_entity_mention_counts(
    pool: &PgPool,
    project: &ProjectRow,
    filter: Option<&ResolvedFilter>,
) -> Result<EntityMentionCounts, DbError> {
    let binds = FilterBinds::new(filter);
    let clause = filter_clause("m", "mentioned_at");

    let brand_sql = format!(
        "SELECT COUNT(m.id) \
         FROM mentions m \
         JOIN prompts p ON p.id = m.prompt_id \
         WHERE m.project_id = $1 AND m.competitor_id IS NULL AND {clause}"
    );
    let brand_count: i64 = sqlx::query_scalar(&brand_sql)
        .bind(project.id)
        .bind(binds.from)
        .bind(binds.to)
        .bind(binds.platform)
        .bind(binds.region)
        .bind(binds.topic)
        .fetch_one(pool)
        .await?;

    let competitor_sql = format!(
        "SELECT c.id, c.name, COUNT(m.id) AS mentions \
         FROM competitors c \
         LEFT JOIN (mentions m JOIN prompts p ON p.id = m.prompt_id) \
             ON m.competitor_id = c.id AND {clause} \
         WHERE c.project_id = $1 \
         GROUP BY c.id, c.name \
         ORDER BY c.id"
    );
    let rows = sqlx::query_as::<_, CompetitorCountRow>(&competitor_sql)
        .bind(project.id)
        .bind(binds.from)
        .bind(binds.to)
        .bind(binds.platform)
        .bind(binds.region)
        .bind(binds.topic)
        .fetch_all(pool)
        .await?;

    Ok(EntityMentionCounts {
        brand: EntityCount::new(
            project.public_id.to_string(),
            project.brand_name.clone(),
            to_count(brand_count),
        ),
        competitors: rows
            .into_iter()
            .map(|r| EntityCount::new(r.id.to_string(), r.name, to_count(r.mentions)))
            .collect(),
    })
}

/// Build the final all-time ranking for a project.
///
/// # Errors
///
/// Returns [`SnapshotError::NotReady`] if any prompt is still unprocessed,
/// [`SnapshotError::Data`] if no mentions were recorded, or
/// [`RankingLookupError::Db`] on query failure.
pub async fn get_ranking_snapshot(
    pool: &PgPool,
    project: &ProjectRow,
) -> Result<RankingSnapshot, RankingLookupError> {
    let progress = check_project_progress(pool, project.id).await?;
    if !progress.all_processed {
        return Err(SnapshotError::NotReady(format!(
            "{} of {} prompts processed",
            progress.processed_units, progress.total_units
        ))
        .into());
    }

    let counts = list_entity_mention_counts(pool, project, None).await?;
    let snapshot = build_ranking_snapshot(counts.brand, counts.competitors)?;

    tracing::debug!(
        project_id = project.id,
        total_mentions = snapshot.total_mentions,
        brand_rank = snapshot.brand.rank,
        "ranking snapshot built"
    );
    Ok(snapshot)
}

/// Share of voice within a filtered window.
///
/// Returns `None` when the window holds no mentions at all. Unlike
/// [`get_ranking_snapshot`] this does not wait for processing to finish.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn share_of_voice(
    pool: &PgPool,
    project: &ProjectRow,
    filter: &ResolvedFilter,
) -> Result<Option<RankingSnapshot>, DbError> {
    let counts = list_entity_mention_counts(pool, project, Some(filter)).await?;
    if counts.total() == 0 {
        return Ok(None);
    }
    Ok(build_ranking_snapshot(counts.brand, counts.competitors).ok())
}

// ---------------------------------------------------------------------------
// Citations
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct CitationQueryRow {
    domain: String,
    prompt_id: i64,
    entity_name: Option<String>,
}

/// List citations for a project within `filter`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_citation_rows(
    pool: &PgPool,
    project_id: i64,
    filter: &ResolvedFilter,
) -> Result<Vec<CitationRow>, DbError> {
    let binds = FilterBinds::new(Some(filter));
    let sql = format!(
        "SELECT ci.domain, ci.prompt_id, \
             CASE WHEN ci.is_brand THEN pr.brand_name ELSE c.name END AS entity_name \
         FROM citations ci \
         JOIN projects pr ON pr.id = ci.project_id \
         JOIN prompts p ON p.id = ci.prompt_id \
         LEFT JOIN competitors c ON c.id = ci.competitor_id \
         WHERE ci.project_id = $1 AND {} \
         ORDER BY ci.id",
        filter_clause("ci", "cited_at")
    );

    let rows = sqlx::query_as::<_, CitationQueryRow>(&sql)
        .bind(project_id)
        .bind(binds.from)
        .bind(binds.to)
        .bind(binds.platform)
        .bind(binds.region)
        .bind(binds.topic)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| CitationRow {
            domain: r.domain,
            prompt_id: r.prompt_id,
            entity_name: r.entity_name,
        })
        .collect())
}

/// Cited domains ranked by citation count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn citation_ranking(
    pool: &PgPool,
    project_id: i64,
    filter: &ResolvedFilter,
) -> Result<Vec<CitationDomain>, DbError> {
    let rows = list_citation_rows(pool, project_id, filter).await?;
    Ok(rank_citation_domains(&rows))
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct SentimentQueryRow {
    entity_name: String,
    is_brand: bool,
    sentiment: Decimal,
}

/// List scored mentions for a project within `filter`. Mentions without a
/// sentiment score are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sentiment_rows(
    pool: &PgPool,
    project_id: i64,
    filter: &ResolvedFilter,
) -> Result<Vec<SentimentRow>, DbError> {
    let binds = FilterBinds::new(Some(filter));
    let sql = format!(
        "SELECT COALESCE(c.name, pr.brand_name) AS entity_name, \
             (m.competitor_id IS NULL) AS is_brand, \
             m.sentiment \
         FROM mentions m \
         JOIN projects pr ON pr.id = m.project_id \
         JOIN prompts p ON p.id = m.prompt_id \
         LEFT JOIN competitors c ON c.id = m.competitor_id \
         WHERE m.project_id = $1 AND m.sentiment IS NOT NULL AND {} \
         ORDER BY m.id",
        filter_clause("m", "mentioned_at")
    );

    let rows = sqlx::query_as::<_, SentimentQueryRow>(&sql)
        .bind(project_id)
        .bind(binds.from)
        .bind(binds.to)
        .bind(binds.platform)
        .bind(binds.region)
        .bind(binds.topic)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| SentimentRow {
            entity_name: r.entity_name,
            kind: if r.is_brand {
                EntityKind::Brand
            } else {
                EntityKind::Competitor
            },
            score: r.sentiment.to_f64().unwrap_or(0.0),
        })
        .collect())
}

/// Per-entity sentiment rollup, brand first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sentiment_rollup(
    pool: &PgPool,
    project_id: i64,
    filter: &ResolvedFilter,
) -> Result<Vec<SentimentRollup>, DbError> {
    let rows = list_sentiment_rows(pool, project_id, filter).await?;
    Ok(rollup_sentiment(&rows))
}
