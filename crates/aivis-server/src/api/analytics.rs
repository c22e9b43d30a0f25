use aivis_core::{CitationDomain, QueryFilter, ResolvedFilter, SentimentRollup};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{find_project, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ShareOfVoiceItem {
    pub id: String,
    pub name: String,
    pub is_brand: bool,
    pub mentions: u64,
    pub percentage: f64,
    pub rank: u32,
}

fn resolve_filter(req_id: &str, query: &QueryFilter) -> Result<ResolvedFilter, ApiError> {
    query
        .resolve(Utc::now())
        .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
}

pub(super) async fn get_share_of_voice(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<String>,
    Query(query): Query<QueryFilter>,
) -> Result<Json<ApiResponse<Vec<ShareOfVoiceItem>>>, ApiError> {
    let project = find_project(&state.pool, &req_id.0, &project_id).await?;
    let filter = resolve_filter(&req_id.0, &query)?;

    let snapshot = aivis_db::share_of_voice(&state.pool, &project, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = snapshot
        .map(|snap| {
            snap.ranked()
                .into_iter()
                .map(|e| ShareOfVoiceItem {
                    is_brand: e.id == snap.brand.id,
                    id: e.id.clone(),
                    name: e.name.clone(),
                    mentions: e.mention_count,
                    percentage: e.percentage,
                    rank: e.rank,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_citations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<String>,
    Query(query): Query<QueryFilter>,
) -> Result<Json<ApiResponse<Vec<CitationDomain>>>, ApiError> {
    let project = find_project(&state.pool, &req_id.0, &project_id).await?;
    let filter = resolve_filter(&req_id.0, &query)?;

    let data = aivis_db::citation_ranking(&state.pool, project.id, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_sentiment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(project_id): Path<String>,
    Query(query): Query<QueryFilter>,
) -> Result<Json<ApiResponse<Vec<SentimentRollup>>>, ApiError> {
    let project = find_project(&state.pool, &req_id.0, &project_id).await?;
    let filter = resolve_filter(&req_id.0, &query)?;

    let data = aivis_db::sentiment_rollup(&state.pool, project.id, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
