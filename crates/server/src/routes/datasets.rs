//! Dataset CRUD, item/split management, versioning, and export.
//!
//! A version's manifest is a frozen snapshot of every item currently in the
//! dataset; export renders that snapshot (joined against each item's
//! annotations) through `services::export` and writes the result to the
//! project's export bucket.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use content_store::Bucket;
use db::models::annotation::Annotation;
use db::models::dataset::{Dataset, DatasetStatus, DatasetType, LabelSchema, NewDataset};
use db::models::dataset_item::{DatasetItem, Split};
use db::models::dataset_version::{DatasetVersion, ManifestItem};
use db::models::project_member::ProjectRole;
use db::repositories::{
    AnnotationRepository, DatasetItemRepository, DatasetRepository, DatasetVersionRepository,
};
use serde::{Deserialize, Serialize};
use services::export;
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/datasets", get(list).post(create))
        .route("/datasets/{id}", get(get_one).delete(remove))
        .route("/datasets/{id}/status", post(set_status))
        .route("/datasets/{id}/items", get(list_items).post(add_item))
        .route("/datasets/{id}/items/next", get(next_unannotated))
        .route("/dataset-items/{id}/priority", post(set_priority))
        .route("/dataset-items/{id}/assign", post(assign))
        .route("/datasets/{id}/versions", get(list_versions).post(create_version))
        .route("/dataset-versions/{id}", get(get_version))
        .route("/dataset-versions/{id}/export", post(export_version))
}

#[derive(Debug, Deserialize)]
struct CreateDatasetRequest {
    slug: String,
    name: String,
    dataset_type: DatasetType,
    #[serde(default)]
    label_schema: LabelSchema,
    #[serde(default = "default_ratio_train")]
    train_ratio: f64,
    #[serde(default = "default_ratio_val")]
    val_ratio: f64,
    #[serde(default = "default_ratio_test")]
    test_ratio: f64,
}

fn default_ratio_train() -> f64 {
    0.8
}
fn default_ratio_val() -> f64 {
    0.1
}
fn default_ratio_test() -> f64 {
    0.1
}

async fn create(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateDatasetRequest>,
) -> Result<Json<ApiResponse<Dataset>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;
    let dataset = DatasetRepository::create(
        &state.pool,
        NewDataset {
            project_id,
            slug: body.slug,
            name: body.name,
            dataset_type: body.dataset_type,
            label_schema: body.label_schema,
            train_ratio: body.train_ratio,
            val_ratio: body.val_ratio,
            test_ratio: body.test_ratio,
        },
    )
    .await?;
    Ok(Json(ApiResponse::ok(dataset)))
}

async fn list(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Dataset>>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;
    let datasets = DatasetRepository::list_for_project(&state.pool, project_id).await?;
    Ok(Json(ApiResponse::ok(datasets)))
}

async fn load_dataset(state: &AppState, id: Uuid) -> Result<Dataset, ApiError> {
    DatasetRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("dataset"))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Dataset>>, ApiError> {
    let dataset = load_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;
    Ok(Json(ApiResponse::ok(dataset)))
}

async fn remove(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let dataset = load_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Admin).await?;
    DatasetRepository::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status: DatasetStatus,
}

async fn set_status(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetStatusRequest>,
) -> Result<StatusCode, ApiError> {
    let dataset = load_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Admin).await?;
    DatasetRepository::set_status(&state.pool, id, body.status).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    media_id: Uuid,
    split: Split,
}

async fn add_item(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<ApiResponse<DatasetItem>>, ApiError> {
    let dataset = load_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Editor).await?;
    let item = DatasetItemRepository::add_media(&state.pool, id, body.media_id, body.split).await?;
    DatasetRepository::refresh_counts(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(item)))
}

#[derive(Debug, Deserialize)]
struct ListItemsQuery {
    split: Option<Split>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

async fn list_items(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<ApiResponse<Vec<DatasetItem>>>, ApiError> {
    let dataset = load_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;
    let items = DatasetItemRepository::list_for_dataset(&state.pool, id, query.split, query.limit.unwrap_or(50), query.offset.unwrap_or(0)).await?;
    Ok(Json(ApiResponse::ok(items)))
}

#[derive(Debug, Deserialize)]
struct NextUnannotatedQuery {
    #[serde(default = "default_next_limit")]
    limit: i64,
}

fn default_next_limit() -> i64 {
    20
}

async fn next_unannotated(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<NextUnannotatedQuery>,
) -> Result<Json<ApiResponse<Vec<DatasetItem>>>, ApiError> {
    let dataset = load_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;
    let items = DatasetItemRepository::next_unannotated(&state.pool, id, query.limit).await?;
    Ok(Json(ApiResponse::ok(items)))
}

async fn load_item_with_dataset(state: &AppState, id: Uuid) -> Result<(DatasetItem, Dataset), ApiError> {
    let item = DatasetItemRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("dataset item"))?;
    let dataset = load_dataset(state, item.dataset_id).await?;
    Ok((item, dataset))
}

#[derive(Debug, Deserialize)]
struct SetPriorityRequest {
    priority: i32,
}

async fn set_priority(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetPriorityRequest>,
) -> Result<StatusCode, ApiError> {
    let (_, dataset) = load_item_with_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Editor).await?;
    DatasetItemRepository::set_priority(&state.pool, id, body.priority).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    assignee_id: Option<Uuid>,
}

async fn assign(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignRequest>,
) -> Result<StatusCode, ApiError> {
    let (_, dataset) = load_item_with_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Editor).await?;
    DatasetItemRepository::assign(&state.pool, id, body.assignee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CreateVersionRequest {
    tag: String,
}

async fn create_version(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateVersionRequest>,
) -> Result<Json<ApiResponse<DatasetVersion>>, ApiError> {
    let dataset = load_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Admin).await?;

    DatasetRepository::refresh_counts(&state.pool, id).await?;
    let refreshed = load_dataset(&state, id).await?;

    let mut manifest = Vec::new();
    let mut offset = 0;
    loop {
        let page = DatasetItemRepository::list_for_dataset(&state.pool, id, None, 1000, offset).await?;
        if page.is_empty() {
            break;
        }
        let page_len = page.len();
        manifest.extend(page.into_iter().map(|item| ManifestItem { item_id: item.id, media_id: item.media_id, split: item.split.to_string() }));
        if page_len < 1000 {
            break;
        }
        offset += 1000;
    }

    let stats = serde_json::json!({
        "item_count": refreshed.item_count,
        "annotated_count": refreshed.annotated_count,
    });

    let version = DatasetVersionRepository::create(&state.pool, id, &body.tag, manifest, stats).await?;
    Ok(Json(ApiResponse::ok(version)))
}

async fn list_versions(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<DatasetVersion>>>, ApiError> {
    let dataset = load_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;
    let versions = DatasetVersionRepository::list_for_dataset(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(versions)))
}

async fn load_version_with_dataset(state: &AppState, id: Uuid) -> Result<(DatasetVersion, Dataset), ApiError> {
    let version = DatasetVersionRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("dataset version"))?;
    let dataset = load_dataset(state, version.dataset_id).await?;
    Ok((version, dataset))
}

async fn get_version(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DatasetVersion>>, ApiError> {
    let (version, dataset) = load_version_with_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;
    Ok(Json(ApiResponse::ok(version)))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ExportFormat {
    Coco,
    Yolo,
    Csv,
    Jsonl,
}

#[derive(Debug, Deserialize)]
struct ExportRequest {
    format: ExportFormat,
}

#[derive(Debug, Serialize)]
struct ExportResponse {
    storage_path: String,
    format: &'static str,
}

async fn export_version(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<ExportRequest>,
) -> Result<Json<ApiResponse<ExportResponse>>, ApiError> {
    let (version, dataset) = load_version_with_dataset(&state, id).await?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Editor).await?;

    let mut items: Vec<export::ExportItem> = Vec::with_capacity(version.manifest.0.len());
    for manifest_item in &version.manifest.0 {
        let annotations: Vec<Annotation> = AnnotationRepository::list_for_item(&state.pool, manifest_item.item_id).await?;
        items.push((manifest_item.clone(), annotations));
    }

    let (bytes, format_name, extension) = match body.format {
        ExportFormat::Coco => {
            let value = export::export_coco(&dataset.name, &dataset.label_schema.0, &items);
            (serde_json::to_vec_pretty(&value).map_err(|e| ApiError::InternalError(e.to_string()))?, "coco", "json")
        }
        ExportFormat::Yolo => (export::export_yolo(&dataset.label_schema.0, &items).into_bytes(), "yolo", "txt"),
        ExportFormat::Csv => (export::export_csv(&items).into_bytes(), "csv", "csv"),
        ExportFormat::Jsonl => (export::export_jsonl(&items).into_bytes(), "jsonl", "jsonl"),
    };

    let storage_path = format!("{}/{}-{}.{extension}", dataset.project_id, version.tag, format_name);
    state.store.put(Bucket::Exports, &storage_path, "application/octet-stream", bytes).await.map_err(ApiError::Store)?;
    DatasetVersionRepository::record_export(&state.pool, id, &storage_path, format_name).await?;

    state.billing.record_usage(dataset.project_id, Some(access.user_id), db::models::billing::UsageType::ComputeSeconds, 1.0, "export").await?;

    Ok(Json(ApiResponse::ok(ExportResponse { storage_path, format: format_name })))
}
