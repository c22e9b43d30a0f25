//! The two endpoints a poll session talks to: the completion check and the
//! final ranking snapshot.

use aivis_core::{JobProgress, RankingSnapshot, SnapshotError};
use aivis_db::RankingLookupError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{find_project, map_db_error, ApiError, AppState};

/// Body of the ranking endpoint. Exactly one of the fields is non-null.
#[derive(Debug, Serialize)]
pub(super) struct RankingEnvelope {
    pub data: Option<RankingSnapshot>,
    pub error: Option<String>,
}

impl RankingEnvelope {
    fn ok(snapshot: RankingSnapshot) -> Self {
        Self {
            data: Some(snapshot),
            error: None,
        }
    }

    fn failed(code: &str, message: &str) -> Self {
        Self {
            data: None,
            error: Some(format!("{code}: {message}")),
        }
    }
}

/// Completion check. Returns the bare progress object, no envelope.
pub(super) async fn get_progress(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<String>,
) -> Result<Json<JobProgress>, ApiError> {
    let project = find_project(&state.pool, &req_id.0, &project_id).await?;

    let progress = aivis_db::check_project_progress(&state.pool, project.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::debug!(
        project_id = project.id,
        processed = progress.processed_units,
        total = progress.total_units,
        "completion check"
    );
    Ok(Json(progress))
}

pub(super) async fn get_ranking(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<String>,
) -> (StatusCode, Json<RankingEnvelope>) {
    let project = match find_project(&state.pool, &req_id.0, &project_id).await {
        Ok(project) => project,
        Err(err) => {
            let status = match err.error.code.as_str() {
                "not_found" => StatusCode::NOT_FOUND,
                "validation_error" => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let code = if status == StatusCode::NOT_FOUND {
                "no_data"
            } else {
                err.error.code.as_str()
            };
            return (status, Json(RankingEnvelope::failed(code, &err.error.message)));
        }
    };

    match aivis_db::get_ranking_snapshot(&state.pool, &project).await {
        Ok(snapshot) => (StatusCode::OK, Json(RankingEnvelope::ok(snapshot))),
        Err(RankingLookupError::Snapshot(SnapshotError::NotReady(msg))) => {
            tracing::warn!(project_id = project.id, reason = %msg, "ranking requested before completion");
            (
                StatusCode::CONFLICT,
                Json(RankingEnvelope::failed("not_ready", &msg)),
            )
        }
        Err(RankingLookupError::Snapshot(SnapshotError::Data(msg))) => (
            StatusCode::NOT_FOUND,
            Json(RankingEnvelope::failed("no_data", &msg)),
        ),
        Err(RankingLookupError::Snapshot(SnapshotError::Unavailable(msg))) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RankingEnvelope::failed("unavailable", &msg)),
        ),
        Err(RankingLookupError::Db(e)) => {
            tracing::error!(error = %e, project_id = project.id, "ranking query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RankingEnvelope::failed("internal_error", "database query failed")),
            )
        }
    }
}
