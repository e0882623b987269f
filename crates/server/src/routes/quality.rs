//! Corpus-wide agreement metrics (Cohen's/Fleiss' kappa) and geometry
//! transform preview for augmentation planning.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use db::models::project_member::ProjectRole;
use serde::{Deserialize, Serialize};
use services::quality::{Geometry, GeometryTransform, cohens_kappa, fleiss_kappa, transform_geometry};
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

const ITEM_PAGE_SIZE: i64 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/datasets/{id}/kappa", get(kappa))
        .route("/annotations/{id}/transform-preview", post(transform_preview))
}

#[derive(Debug, Deserialize)]
struct KappaQuery {
    #[serde(default = "default_metric")]
    metric: KappaMetric,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum KappaMetric {
    Cohens,
    Fleiss,
}

fn default_metric() -> KappaMetric {
    KappaMetric::Fleiss
}

#[derive(Debug, Serialize)]
struct KappaResponse {
    metric: &'static str,
    score: f64,
    items_considered: usize,
}

async fn kappa(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<KappaQuery>,
) -> Result<Json<ApiResponse<KappaResponse>>, ApiError> {
    let dataset = db::repositories::DatasetRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("dataset"))?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Admin).await?;

    let mut per_item_labels: Vec<Vec<String>> = Vec::new();
    let mut cohens_pairs: Vec<(String, String)> = Vec::new();
    let mut offset = 0;
    loop {
        let page = db::repositories::DatasetItemRepository::list_for_dataset(&state.pool, id, None, ITEM_PAGE_SIZE, offset).await?;
        if page.is_empty() {
            break;
        }
        let page_len = page.len();
        for item in &page {
            let annotations = db::repositories::AnnotationRepository::list_for_item(&state.pool, item.id).await?;
            if annotations.is_empty() {
                continue;
            }
            let mut labels: Vec<String> = annotations.iter().map(|a| a.label.clone()).collect();
            labels.sort();
            if labels.len() == 2 {
                cohens_pairs.push((labels[0].clone(), labels[1].clone()));
            }
            per_item_labels.push(labels);
        }
        if (page_len as i64) < ITEM_PAGE_SIZE {
            break;
        }
        offset += ITEM_PAGE_SIZE;
    }

    let (metric, score, items_considered) = match query.metric {
        KappaMetric::Cohens => ("cohens", cohens_kappa(&cohens_pairs), cohens_pairs.len()),
        KappaMetric::Fleiss => ("fleiss", fleiss_kappa(&per_item_labels), per_item_labels.len()),
    };

    Ok(Json(ApiResponse::ok(KappaResponse { metric, score, items_considered })))
}

#[derive(Debug, Deserialize)]
struct TransformPreviewRequest {
    geometry: Geometry,
    transforms: Vec<GeometryTransform>,
    width: f64,
    height: f64,
}

async fn transform_preview(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransformPreviewRequest>,
) -> Result<Json<ApiResponse<Geometry>>, ApiError> {
    let annotation = db::repositories::AnnotationRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("annotation"))?;
    let item = db::repositories::DatasetItemRepository::find_by_id(&state.pool, annotation.dataset_item_id)
        .await?
        .ok_or(ApiError::NotFound("dataset item"))?;
    let dataset = db::repositories::DatasetRepository::find_by_id(&state.pool, item.dataset_id).await?.ok_or(ApiError::NotFound("dataset"))?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;

    let transformed = transform_geometry(body.geometry, &body.transforms, body.width, body.height);
    Ok(Json(ApiResponse::ok(transformed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kappa_query_defaults_to_fleiss() {
        let query: KappaQuery = serde_json::from_str("{}").unwrap();
        assert!(matches!(query.metric, KappaMetric::Fleiss));
    }

    #[test]
    fn kappa_query_honors_explicit_cohens() {
        let query: KappaQuery = serde_json::from_str(r#"{"metric":"cohens"}"#).unwrap();
        assert!(matches!(query.metric, KappaMetric::Cohens));
    }
}
