//! Completion check over a project's prompts.

use aivis_core::JobProgress;
use sqlx::PgPool;

use crate::DbError;

/// Raw prompt counts for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ProgressCounts {
    pub processed: i64,
    pub total: i64,
}

impl ProgressCounts {
    #[must_use]
    pub fn to_job_progress(self) -> JobProgress {
        JobProgress::new(clamp_count(self.processed), clamp_count(self.total))
    }
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Count a project's prompts and how many have finished analysis.
///
/// A prompt is finished once it is `processed` or `failed`. The read has no
/// side effects, so repeated calls with no intervening writes agree.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn check_project_progress(pool: &PgPool, project_id: i64) -> Result<JobProgress, DbError> {
    let counts = sqlx::query_as::<_, ProgressCounts>(
        "SELECT \
             COUNT(*) FILTER (WHERE status IN ('processed', 'failed')) AS processed, \
             COUNT(*) AS total \
         FROM prompts \
         WHERE project_id = $1",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    Ok(counts.to_job_progress())
}
