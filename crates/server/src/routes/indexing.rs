//! Enrichment pipeline dispatch: kick off CLIP/DINO/VLM/text jobs for a
//! project's media, check progress, and retry failures.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use db::models::project_member::ProjectRole;
use serde::Deserialize;
use services::dispatcher::{DispatchResult, IndexingStats, Pipeline, DEFAULT_PIPELINES};
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/index", post(dispatch))
        .route("/projects/{project_id}/index/stats", get(stats))
        .route("/projects/{project_id}/index/retry", post(retry_failed))
}

#[derive(Debug, Deserialize)]
struct DispatchRequest {
    #[serde(default)]
    media_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pipelines: Option<Vec<Pipeline>>,
    #[serde(default)]
    custom_prompt_id: Option<String>,
    #[serde(default)]
    priority: i32,
}

async fn dispatch(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<DispatchRequest>,
) -> Result<Json<ApiResponse<DispatchResult>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;
    let pipelines = body.pipelines.unwrap_or_else(|| DEFAULT_PIPELINES.to_vec());
    let result = state
        .dispatcher
        .dispatch(project_id, body.media_ids, &pipelines, body.custom_prompt_id.as_deref(), body.priority)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

async fn stats(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<IndexingStats>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;
    let stats = state.dispatcher.stats(project_id).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

async fn retry_failed(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DispatchResult>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;
    let result = state.dispatcher.sweep_failed(project_id).await?;
    Ok(Json(ApiResponse::ok(result)))
}
