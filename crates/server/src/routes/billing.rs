//! Project subscription and usage metering endpoints.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use db::models::billing::{PlanTier, Subscription};
use db::models::project_member::ProjectRole;
use serde::Deserialize;
use services::billing::UsageSummary;
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/usage", get(usage))
        .route("/projects/{project_id}/subscribe", post(subscribe))
}

async fn usage(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UsageSummary>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Admin).await?;
    let summary = state.billing.usage_summary(project_id).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    tier: PlanTier,
}

async fn subscribe(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<SubscribeRequest>,
) -> Result<Json<ApiResponse<Subscription>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Owner).await?;
    let subscription = state.billing.subscribe(project_id, body.tier).await?;
    Ok(Json(ApiResponse::ok(subscription)))
}
