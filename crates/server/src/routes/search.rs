//! Hybrid search and similarity lookups over a project's media.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::post,
};
use db::models::media::Media;
use db::models::project_member::ProjectRole;
use serde::{Deserialize, Serialize};
use services::search::{RankedHit, SearchRequest, SimilarMethod};
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/search", post(search))
        .route("/media/{id}/similar", post(similar))
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    query: Option<String>,
    image_ref: Option<String>,
    #[serde(default)]
    media_types: Option<Vec<String>>,
    min_confidence: Option<f32>,
    #[serde(default = "default_true")]
    use_clip: bool,
    #[serde(default = "default_true")]
    use_text: bool,
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

fn default_true() -> bool {
    true
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize)]
struct SearchResultItem {
    media: Media,
    hit: RankedHit,
}

#[derive(Debug, Serialize)]
struct SearchResponseBody {
    results: Vec<SearchResultItem>,
    total: usize,
    took_ms: u64,
}

async fn search(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<SearchBody>,
) -> Result<Json<ApiResponse<SearchResponseBody>>, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;

    let response = state
        .search_engine
        .search(SearchRequest {
            project_id,
            query: body.query,
            image_ref: body.image_ref,
            media_types: body.media_types,
            min_confidence: body.min_confidence,
            use_clip: body.use_clip,
            use_text: body.use_text,
            limit: body.limit,
            offset: body.offset,
        })
        .await?;

    Ok(Json(ApiResponse::ok(SearchResponseBody {
        total: response.total,
        took_ms: response.took_ms,
        results: response.results.into_iter().map(|(media, hit)| SearchResultItem { media, hit }).collect(),
    })))
}

#[derive(Debug, Deserialize)]
struct SimilarBody {
    #[serde(default = "default_method")]
    method: SimilarMethodBody,
    #[serde(default = "default_limit")]
    limit: u64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum SimilarMethodBody {
    Clip,
    Dino,
    Combined,
}

fn default_method() -> SimilarMethodBody {
    SimilarMethodBody::Combined
}

impl From<SimilarMethodBody> for SimilarMethod {
    fn from(value: SimilarMethodBody) -> Self {
        match value {
            SimilarMethodBody::Clip => SimilarMethod::Clip,
            SimilarMethodBody::Dino => SimilarMethod::Dino,
            SimilarMethodBody::Combined => SimilarMethod::Combined,
        }
    }
}

async fn similar(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<SimilarBody>,
) -> Result<Json<ApiResponse<Vec<RankedHit>>>, ApiError> {
    let media = db::repositories::MediaRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("media"))?;
    access.check_project_access(&state.pool, media.project_id, ProjectRole::Viewer).await?;

    let hits = state.search_engine.similar(id, body.method.into(), body.limit).await?;
    Ok(Json(ApiResponse::ok(hits)))
}
