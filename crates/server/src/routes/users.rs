//! Superuser-only user administration: listing and activation toggling.
//! Self-service account details live under `/auth/me`.

use axum::{Extension, Json, Router, extract::{Path, State}, http::StatusCode, routing::{get, post}};
use db::repositories::UserRepository;
use serde::Deserialize;
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, routes::auth::PublicUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}", get(get_one))
        .route("/users/{id}/active", post(set_active))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PublicUser>>, ApiError> {
    access.require_active()?;
    let user = UserRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("user"))?;
    Ok(Json(ApiResponse::ok(user.into())))
}

#[derive(Debug, Deserialize)]
struct SetActiveRequest {
    is_active: bool,
}

async fn set_active(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetActiveRequest>,
) -> Result<StatusCode, ApiError> {
    access.require_superuser()?;
    UserRepository::set_active(&state.pool, id, body.is_active).await?;
    Ok(StatusCode::NO_CONTENT)
}
