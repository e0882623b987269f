//! Email/password registration and session login, replacing the GitHub
//! device-flow this module used in the teacher. Sessions are bearer tokens
//! handed back once at login and never again; only their SHA256 hash is
//! persisted (`db::services::AuthService::hash_session_token`).

use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use db::models::user::User;
use db::repositories::{SessionRepository, UserRepository};
use db::services::AuthService;
use serde::{Deserialize, Serialize};
use utils::ApiResponse;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

/// Unauthenticated: register/login issue a session, logout just clears one.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Session-gated: reads back the caller's own identity.
pub fn router() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: uuid::Uuid,
    pub email: String,
    pub display_name: String,
    pub is_superuser: bool,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self { id: user.id, email: user.email, display_name: user.display_name, is_superuser: user.is_superuser }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<PublicUser>>, ApiError> {
    if body.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".to_string()));
    }
    let password_hash = AuthService::hash_password(&body.password)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let user = UserRepository::create(&state.pool, &body.email, &password_hash, &body.display_name).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = UserRepository::find_by_email(&state.pool, &body.email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let valid = AuthService::verify_password(&body.password, &user.password_hash)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    if !valid {
        return Err(ApiError::Unauthorized);
    }

    let raw_token = AuthService::generate_session_id();
    let token_hash = AuthService::hash_session_token(&raw_token);
    SessionRepository::create(&state.pool, user.id, &token_hash, state.config.access_token_ttl_hours as i64).await?;

    let body = ApiResponse::ok(AuthResponse { token: raw_token.clone(), user: user.into() });
    let mut response = Json(body).into_response();
    let cookie = format!("session_id={raw_token}; HttpOnly; SameSite=Lax; Path=/");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert("set-cookie", value);
    }
    Ok(response)
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let auth_header = headers.get("authorization").and_then(|h| h.to_str().ok());
    let cookie_header = headers.get("cookie").and_then(|h| h.to_str().ok());

    let raw_token = cookie_header
        .and_then(|h| h.split(';').find_map(|c| c.trim().strip_prefix("session_id=").map(str::to_string)))
        .or_else(|| auth_header.and_then(|h| h.strip_prefix("Bearer ")).map(str::to_string));

    if let Some(raw_token) = raw_token {
        let token_hash = AuthService::hash_session_token(&raw_token);
        SessionRepository::delete_by_token_hash(&state.pool, &token_hash).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
) -> Result<Json<ApiResponse<PublicUser>>, ApiError> {
    let user = UserRepository::find_by_id(&state.pool, access.user_id).await?.ok_or(ApiError::Unauthorized)?;
    Ok(Json(ApiResponse::ok(user.into())))
}
