//! Media upload and retrieval. Upload accepts a multipart body, stores the
//! raw bytes under the project's media bucket keyed by checksum so a
//! re-upload of identical bytes is detected before the blob is written
//! twice, then creates the `Media` row that the enrichment workers pick up
//! off the task queue.

use axum::{
    Extension, Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use content_store::{Bucket, Store};
use db::models::billing::UsageType;
use db::models::media::{Media, MediaKind, NewMedia};
use db::models::media_source::NewMediaSource;
use db::models::project_member::ProjectRole;
use db::repositories::{MediaRepository, MediaSourceRepository};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, middleware::enforce_quota, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/media", post(upload).get(list))
        .route("/media/{id}", get(get_one).delete(remove))
        .route("/media/{id}/sources", post(add_source).get(list_sources))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

fn mime_to_kind(mime_type: &str) -> MediaKind {
    if mime_type.starts_with("image/") {
        MediaKind::Image
    } else if mime_type.starts_with("video/") {
        MediaKind::Video
    } else if mime_type.starts_with("audio/") {
        MediaKind::Audio
    } else if mime_type == "text/plain" || mime_type == "text/markdown" {
        MediaKind::Text
    } else {
        MediaKind::Document
    }
}

async fn upload(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Media>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Editor).await?;
    enforce_quota(&state.billing, project_id, UsageType::StorageBytes).await?;

    let mut filename = None;
    let mut mime_type = None;
    let mut bytes = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.to_string()))? {
        if field.name() == Some("file") {
            filename = field.file_name().map(str::to_string);
            mime_type = field.content_type().map(str::to_string);
            bytes = Some(field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?.to_vec());
        }
    }

    let filename = filename.ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;
    let mime_type = mime_type.unwrap_or_else(|| "application/octet-stream".to_string());
    let bytes = bytes.ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;

    if bytes.len() as u64 > state.config.max_upload_size_bytes {
        return Err(ApiError::BadRequest("file exceeds maximum upload size".to_string()));
    }

    let kind = mime_to_kind(&mime_type);
    let allowed = match kind {
        MediaKind::Image => &state.config.allowed_image_mime,
        MediaKind::Video => &state.config.allowed_video_mime,
        MediaKind::Audio => &state.config.allowed_audio_mime,
        MediaKind::Text | MediaKind::Document => return Err(ApiError::BadRequest(format!("unsupported content type: {mime_type}"))),
    };
    if !allowed.iter().any(|m| m == &mime_type) {
        return Err(ApiError::BadRequest(format!("content type not allowed: {mime_type}")));
    }

    let checksum = hex::encode(Sha256::digest(&bytes));
    if let Some(existing) = MediaRepository::find_by_checksum(&state.pool, project_id, &checksum).await? {
        return Ok(Json(ApiResponse::ok(existing)));
    }

    let storage_path = format!("{project_id}/{checksum}");
    state.store.put(Bucket::Media, &storage_path, &mime_type, bytes.clone()).await.map_err(db_store_error)?;

    let (width, height) = match kind {
        MediaKind::Image => image_dimensions(&bytes),
        _ => (None, None),
    };

    let media = MediaRepository::create(
        &state.pool,
        NewMedia {
            project_id,
            filename,
            kind,
            mime_type,
            size_bytes: bytes.len() as i64,
            checksum_sha256: checksum,
            storage_path,
            width,
            height,
            duration_sec: None,
            fps: None,
        },
    )
    .await?;

    state.billing.record_usage(project_id, Some(access.user_id), UsageType::StorageBytes, bytes.len() as f64, "bytes").await?;

    Ok(Json(ApiResponse::ok(media)))
}

fn image_dimensions(bytes: &[u8]) -> (Option<i32>, Option<i32>) {
    image::load_from_memory(bytes).ok().map(|img| (Some(img.width() as i32), Some(img.height() as i32))).unwrap_or((None, None))
}

fn db_store_error(err: content_store::StoreError) -> ApiError {
    ApiError::Store(err)
}

async fn list(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Media>>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;
    let items = MediaRepository::list_for_project(&state.pool, project_id, query.limit.unwrap_or(50), query.offset.unwrap_or(0)).await?;
    Ok(Json(ApiResponse::ok(items)))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Media>>, ApiError> {
    let media = MediaRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("media"))?;
    access.check_project_access(&state.pool, media.project_id, ProjectRole::Viewer).await?;
    Ok(Json(ApiResponse::ok(media)))
}

async fn remove(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let media = MediaRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("media"))?;
    access.check_project_access(&state.pool, media.project_id, ProjectRole::Admin).await?;
    state.store.delete(Bucket::Media, &media.storage_path).await.map_err(db_store_error)?;
    MediaRepository::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AddSourceRequest {
    source_type: String,
    url: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SourceResponse {
    id: Uuid,
}

async fn add_source(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(media_id): Path<Uuid>,
    Json(body): Json<AddSourceRequest>,
) -> Result<Json<ApiResponse<SourceResponse>>, ApiError> {
    let media = MediaRepository::find_by_id(&state.pool, media_id).await?.ok_or(ApiError::NotFound("media"))?;
    access.check_project_access(&state.pool, media.project_id, ProjectRole::Editor).await?;

    let source = MediaSourceRepository::create(
        &state.pool,
        NewMediaSource { media_id, source_type: body.source_type, url: body.url, content: body.content },
    )
    .await?;
    Ok(Json(ApiResponse::ok(SourceResponse { id: source.id })))
}

async fn list_sources(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(media_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<db::models::media_source::MediaSource>>>, ApiError> {
    let media = MediaRepository::find_by_id(&state.pool, media_id).await?.ok_or(ApiError::NotFound("media"))?;
    access.check_project_access(&state.pool, media.project_id, ProjectRole::Viewer).await?;
    let sources = MediaSourceRepository::list_for_media(&state.pool, media_id).await?;
    Ok(Json(ApiResponse::ok(sources)))
}
