//! Dataset augmentation: derive a transformed media item (and its
//! transformed annotations) from an existing dataset item.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::post,
};
use db::models::project_member::ProjectRole;
use serde::{Deserialize, Serialize};
use services::enrichment::WorkerOutcome;
use services::quality::GeometryTransform;
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/dataset-items/{item_id}/augment", post(augment))
}

#[derive(Debug, Deserialize)]
struct AugmentRequest {
    transforms: Vec<GeometryTransform>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum AugmentResponse {
    Completed,
    Skipped { reason: &'static str },
    Failed { error: String },
}

impl From<WorkerOutcome> for AugmentResponse {
    fn from(value: WorkerOutcome) -> Self {
        match value {
            WorkerOutcome::Completed => AugmentResponse::Completed,
            WorkerOutcome::Skipped { reason } => AugmentResponse::Skipped { reason },
            WorkerOutcome::Failed { error } => AugmentResponse::Failed { error },
        }
    }
}

async fn augment(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(item_id): Path<Uuid>,
    Json(body): Json<AugmentRequest>,
) -> Result<Json<ApiResponse<AugmentResponse>>, ApiError> {
    let item = db::repositories::DatasetItemRepository::find_by_id(&state.pool, item_id).await?.ok_or(ApiError::NotFound("dataset item"))?;
    let dataset = db::repositories::DatasetRepository::find_by_id(&state.pool, item.dataset_id).await?.ok_or(ApiError::NotFound("dataset"))?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Editor).await?;

    let outcome = state.augmentation_worker.process(dataset.project_id, dataset.id, item_id, &body.transforms).await?;
    Ok(Json(ApiResponse::ok(AugmentResponse::from(outcome))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_outcome_serializes_without_extra_fields() {
        let response = AugmentResponse::from(WorkerOutcome::Completed);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "completed"}));
    }

    #[test]
    fn skipped_outcome_carries_its_reason() {
        let response = AugmentResponse::from(WorkerOutcome::Skipped { reason: "no annotations to transform" });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "skipped", "reason": "no annotations to transform"}));
    }

    #[test]
    fn failed_outcome_carries_its_error() {
        let response = AugmentResponse::from(WorkerOutcome::Failed { error: "store unreachable".to_string() });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "failed", "error": "store unreachable"}));
    }
}
