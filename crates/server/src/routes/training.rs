//! Training job lifecycle: queue, list, progress/result reporting, and
//! cancel, gated by the project's `max_concurrent_training_jobs` quota.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use db::models::project_member::ProjectRole;
use db::models::training_job::{ModelType, TrainingJob, TrainingJobStatus};
use db::repositories::TrainingJobRepository;
use serde::Deserialize;
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/training-jobs", get(list).post(queue))
        .route("/training-jobs/{id}", get(get_one))
        .route("/training-jobs/{id}/advance", post(advance))
        .route("/training-jobs/{id}/progress", post(record_progress))
        .route("/training-jobs/{id}/result", post(record_result))
        .route("/training-jobs/{id}/cancel", post(cancel))
}

async fn load_job(state: &AppState, id: Uuid) -> Result<TrainingJob, ApiError> {
    TrainingJobRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("training job"))
}

#[derive(Debug, Deserialize)]
struct QueueRequest {
    dataset_version_id: Uuid,
    model_type: ModelType,
    #[serde(default)]
    base_model: Option<String>,
    #[serde(default)]
    hyperparameters: serde_json::Value,
    total_epochs: i32,
}

async fn queue(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<QueueRequest>,
) -> Result<Json<ApiResponse<TrainingJob>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;

    let active = state.training.active_count(project_id).await?;
    if active >= state.config.max_concurrent_training_jobs as usize {
        return Err(ApiError::RateLimited("project has reached its concurrent training job limit".to_string(), None));
    }

    let job = state
        .training
        .queue(project_id, body.dataset_version_id, body.model_type, body.base_model.as_deref(), body.hyperparameters, body.total_epochs)
        .await?;
    Ok(Json(ApiResponse::ok(job)))
}

async fn list(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TrainingJob>>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;
    let jobs = TrainingJobRepository::list_for_project(&state.pool, project_id).await?;
    Ok(Json(ApiResponse::ok(jobs)))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TrainingJob>>, ApiError> {
    let job = load_job(&state, id).await?;
    access.check_project_access(&state.pool, job.project_id, ProjectRole::Viewer).await?;
    Ok(Json(ApiResponse::ok(job)))
}

#[derive(Debug, Deserialize)]
struct AdvanceRequest {
    status: TrainingJobStatus,
}

async fn advance(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdvanceRequest>,
) -> Result<Json<ApiResponse<TrainingJob>>, ApiError> {
    let job = load_job(&state, id).await?;
    access.check_project_access(&state.pool, job.project_id, ProjectRole::Editor).await?;
    let updated = state.training.advance(id, body.status).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

#[derive(Debug, Deserialize)]
struct ProgressRequest {
    current_epoch: i32,
    train_loss: Option<f64>,
    val_loss: Option<f64>,
}

async fn record_progress(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<ProgressRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let job = load_job(&state, id).await?;
    access.check_project_access(&state.pool, job.project_id, ProjectRole::Editor).await?;
    state.training.record_progress(id, body.current_epoch, body.train_loss, body.val_loss).await?;
    Ok(Json(ApiResponse::ok(())))
}

#[derive(Debug, Deserialize)]
struct ResultRequest {
    model_path: String,
    #[serde(default)]
    metrics: serde_json::Value,
}

async fn record_result(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResultRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let job = load_job(&state, id).await?;
    access.check_project_access(&state.pool, job.project_id, ProjectRole::Editor).await?;
    state.training.record_result(id, &body.model_path, body.metrics).await?;
    Ok(Json(ApiResponse::ok(())))
}

async fn cancel(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TrainingJob>>, ApiError> {
    let job = load_job(&state, id).await?;
    access.check_project_access(&state.pool, job.project_id, ProjectRole::Editor).await?;
    let cancelled = state.training.cancel(id).await?;
    Ok(Json(ApiResponse::ok(cancelled)))
}
