//! Database operations for `projects`, `competitors`, and `prompts`.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `projects` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub brand_name: String,
    pub brand_domain: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompetitorRow {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub domain: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptRow {
    pub id: i64,
    pub project_id: i64,
    pub text: String,
    pub topic: Option<String>,
    pub region: Option<String>,
    pub status: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a prompt's background analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStatus {
    Queued,
    Processing,
    Processed,
    Failed,
}

impl PromptStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Processed and failed prompts both count as finished work.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }
}

impl fmt::Display for PromptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(DbError::InvalidPromptStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Insert a new project with a freshly generated public id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_project(
    pool: &PgPool,
    name: &str,
    brand_name: &str,
    brand_domain: Option<&str>,
    logo_url: Option<&str>,
) -> Result<ProjectRow, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(
        "INSERT INTO projects (public_id, name, brand_name, brand_domain, logo_url) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, public_id, name, brand_name, brand_domain, logo_url, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(brand_name)
    .bind(brand_domain)
    .bind(logo_url)
    .fetch_one(pool)
    .await?;

    tracing::info!(project_id = row.id, public_id = %row.public_id, "project created");
    Ok(row)
}

/// Look up a project by the UUID exposed over the API.
///
/// Returns `None` if no project has that id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_project_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<ProjectRow>, DbError> {
    let row = sqlx::query_as::<_, ProjectRow>(
        "SELECT id, public_id, name, brand_name, brand_domain, logo_url, created_at \
         FROM projects \
         WHERE public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// Competitors
// ---------------------------------------------------------------------------

/// Add a competitor to a project and return its id.
///
/// Re-adding a name that already exists updates its domain and returns the
/// existing id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn add_competitor(
    pool: &PgPool,
    project_id: i64,
    name: &str,
    domain: Option<&str>,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO competitors (project_id, name, domain) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (project_id, name) DO UPDATE SET domain = EXCLUDED.domain \
         RETURNING id",
    )
    .bind(project_id)
    .bind(name)
    .bind(domain)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// List a project's competitors in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_competitors(pool: &PgPool, project_id: i64) -> Result<Vec<CompetitorRow>, DbError> {
    let rows = sqlx::query_as::<_, CompetitorRow>(
        "SELECT id, project_id, name, domain, created_at \
         FROM competitors \
         WHERE project_id = $1 \
         ORDER BY id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Queue a prompt for analysis and return its id.
///
/// `region` is stored upper-cased so region filters match regardless of input
/// case.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn add_prompt(
    pool: &PgPool,
    project_id: i64,
    text: &str,
    topic: Option<&str>,
    region: Option<&str>,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO prompts (project_id, text, topic, region) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(project_id)
    .bind(text)
    .bind(topic)
    .bind(region.map(str::to_uppercase))
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Move a prompt to `status`. Terminal statuses stamp `processed_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no prompt has `prompt_id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_prompt_status(
    pool: &PgPool,
    prompt_id: i64,
    status: PromptStatus,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE prompts \
         SET status = $2, \
             processed_at = CASE WHEN $3 THEN NOW() ELSE NULL END \
         WHERE id = $1",
    )
    .bind(prompt_id)
    .bind(status.as_str())
    .bind(status.is_terminal())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    tracing::debug!(prompt_id, status = %status, "prompt status updated");
    Ok(())
}
