//! Annotation CRUD, review workflow, and inter-annotator agreement scoring.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use db::models::agreement_score::AgreementScore;
use db::models::annotation::{Annotation, AnnotationType, AnnotationSource, NewAnnotation};
use db::models::annotation_review::{AnnotationReview, ReviewStatus};
use db::models::dataset_item::DatasetItem;
use db::models::project_member::ProjectRole;
use db::repositories::{
    AgreementScoreRepository, AnnotationRepository, AnnotationReviewRepository, DatasetItemRepository, DatasetRepository,
};
use serde::Deserialize;
use services::quality::AgreementEntry;
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dataset-items/{item_id}/annotations", get(list_for_item).post(create))
        .route("/annotations/{id}", get(get_one).delete(remove))
        .route("/annotations/{id}/geometry", post(update_geometry))
        .route("/annotations/{id}/reviews", post(request_review))
        .route("/reviews/pending", get(list_pending))
        .route("/reviews/{id}/resolve", post(resolve_review))
        .route("/dataset-items/{item_id}/agreement", get(latest_agreement).post(compute_agreement))
        .route("/datasets/{dataset_id}/agreement", get(list_agreement))
}

async fn item_and_dataset_project(state: &AppState, item_id: Uuid) -> Result<(DatasetItem, Uuid), ApiError> {
    let item = DatasetItemRepository::find_by_id(&state.pool, item_id).await?.ok_or(ApiError::NotFound("dataset item"))?;
    let dataset = DatasetRepository::find_by_id(&state.pool, item.dataset_id).await?.ok_or(ApiError::NotFound("dataset"))?;
    Ok((item, dataset.project_id))
}

async fn annotation_project(state: &AppState, annotation_id: Uuid) -> Result<(Annotation, Uuid), ApiError> {
    let annotation = AnnotationRepository::find_by_id(&state.pool, annotation_id).await?.ok_or(ApiError::NotFound("annotation"))?;
    let (_, project_id) = item_and_dataset_project(state, annotation.dataset_item_id).await?;
    Ok((annotation, project_id))
}

#[derive(Debug, Deserialize)]
struct CreateAnnotationRequest {
    annotation_type: AnnotationType,
    label: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
    geometry: serde_json::Value,
    #[serde(default)]
    attributes: serde_json::Value,
    frame_or_time: Option<f64>,
    #[serde(default = "default_source")]
    source: AnnotationSource,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_source() -> AnnotationSource {
    AnnotationSource::Manual
}

async fn create(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(item_id): Path<Uuid>,
    Json(body): Json<CreateAnnotationRequest>,
) -> Result<Json<ApiResponse<Annotation>>, ApiError> {
    let (item, project_id) = item_and_dataset_project(&state, item_id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;

    let annotation = AnnotationRepository::create(
        &state.pool,
        NewAnnotation {
            dataset_item_id: item_id,
            user_id: access.user_id,
            annotation_type: body.annotation_type,
            label: body.label,
            confidence: body.confidence,
            geometry: body.geometry,
            attributes: body.attributes,
            frame_or_time: body.frame_or_time,
            source: body.source,
        },
    )
    .await?;

    if !item.is_annotated {
        DatasetItemRepository::set_annotated(&state.pool, item_id, true).await?;
        DatasetRepository::refresh_counts(&state.pool, item.dataset_id).await?;
    }

    Ok(Json(ApiResponse::ok(annotation)))
}

async fn list_for_item(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Annotation>>>, ApiError> {
    let (_, project_id) = item_and_dataset_project(&state, item_id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;
    let annotations = AnnotationRepository::list_for_item(&state.pool, item_id).await?;
    Ok(Json(ApiResponse::ok(annotations)))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Annotation>>, ApiError> {
    let (annotation, project_id) = annotation_project(&state, id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;
    Ok(Json(ApiResponse::ok(annotation)))
}

async fn remove(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let (_, project_id) = annotation_project(&state, id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;
    AnnotationRepository::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct UpdateGeometryRequest {
    geometry: serde_json::Value,
}

async fn update_geometry(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGeometryRequest>,
) -> Result<StatusCode, ApiError> {
    let (_, project_id) = annotation_project(&state, id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;
    AnnotationRepository::update_geometry(&state.pool, id, body.geometry).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct RequestReviewBody {
    reviewer_id: Uuid,
}

async fn request_review(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<RequestReviewBody>,
) -> Result<Json<ApiResponse<AnnotationReview>>, ApiError> {
    let (_, project_id) = annotation_project(&state, id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;
    let review = AnnotationReviewRepository::create(&state.pool, id, body.reviewer_id).await?;
    Ok(Json(ApiResponse::ok(review)))
}

async fn list_pending(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
) -> Result<Json<ApiResponse<Vec<AnnotationReview>>>, ApiError> {
    access.require_active()?;
    let reviews = AnnotationReviewRepository::list_pending(&state.pool, access.user_id).await?;
    Ok(Json(ApiResponse::ok(reviews)))
}

#[derive(Debug, Deserialize)]
struct ResolveReviewRequest {
    decision: ReviewStatus,
    comment: Option<String>,
}

async fn resolve_review(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResolveReviewRequest>,
) -> Result<Json<ApiResponse<AnnotationReview>>, ApiError> {
    let review = AnnotationReviewRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("annotation_review"))?;
    let (_, project_id) = annotation_project(&state, review.annotation_id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Admin).await?;

    let resolved = AnnotationReviewRepository::resolve(&state.pool, id, body.decision, body.comment).await?;
    Ok(Json(ApiResponse::ok(resolved)))
}

#[derive(Debug, Deserialize)]
struct ComputeAgreementRequest {
    #[serde(default = "default_metric")]
    metric: String,
}

fn default_metric() -> String {
    "label".to_string()
}

async fn compute_agreement(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(item_id): Path<Uuid>,
    Json(body): Json<ComputeAgreementRequest>,
) -> Result<Json<ApiResponse<AgreementScore>>, ApiError> {
    let (item, project_id) = item_and_dataset_project(&state, item_id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Admin).await?;

    let annotations = AnnotationRepository::list_for_item(&state.pool, item_id).await?;
    let entries: Vec<AgreementEntry> = annotations
        .iter()
        .map(|a| AgreementEntry {
            user_id: a.user_id.to_string(),
            label: a.label.clone(),
            ann_type: a.annotation_type.to_string(),
            geometry: bbox_from_geometry(a),
        })
        .collect();

    let score = match body.metric.as_str() {
        "iou" => services::quality::iou_agreement(&entries),
        "percent" => services::quality::percent_agreement(&entries),
        _ => services::quality::label_agreement(&entries),
    };

    let annotator_ids: Vec<Uuid> = {
        let mut ids: Vec<Uuid> = annotations.iter().map(|a| a.user_id).collect();
        ids.sort();
        ids.dedup();
        ids
    };

    let recorded = AgreementScoreRepository::record(
        &state.pool,
        item.dataset_id,
        item_id,
        annotator_ids,
        &body.metric,
        score,
        serde_json::json!({}),
    )
    .await?;
    Ok(Json(ApiResponse::ok(recorded)))
}

fn bbox_from_geometry(annotation: &Annotation) -> Option<services::quality::BBox> {
    if annotation.annotation_type != AnnotationType::Bbox {
        return None;
    }
    let geom = &annotation.geometry.0;
    Some(services::quality::BBox {
        x: geom.get("x")?.as_f64()?,
        y: geom.get("y")?.as_f64()?,
        w: geom.get("w")?.as_f64()?,
        h: geom.get("h")?.as_f64()?,
    })
}

async fn latest_agreement(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Option<AgreementScore>>>, ApiError> {
    let (_, project_id) = item_and_dataset_project(&state, item_id).await?;
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;
    let score = AgreementScoreRepository::latest_for_item(&state.pool, item_id).await?;
    Ok(Json(ApiResponse::ok(score)))
}

async fn list_agreement(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(dataset_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<AgreementScore>>>, ApiError> {
    let dataset = DatasetRepository::find_by_id(&state.pool, dataset_id).await?.ok_or(ApiError::NotFound("dataset"))?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;
    let scores = AgreementScoreRepository::list_for_dataset(&state.pool, dataset_id).await?;
    Ok(Json(ApiResponse::ok(scores)))
}
