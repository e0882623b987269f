use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use db::models::RepoError;
use services::ServiceError;
use thiserror::Error;
use utils::ApiResponse;
use vector_index::VectorIndexError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),
    #[error(transparent)]
    Store(#[from] content_store::StoreError),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    /// Raised by either the token-bucket rate limiter or a billing quota
    /// rejection; both producers collapse to this one variant per
    /// `SPEC_FULL.md` §7 — the taxonomy isn't widened, only its producers.
    #[error("rate limited: {0}")]
    RateLimited(String, Option<u64>),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::Service(ServiceError::Repo(err)) => repo_status(err),
            ApiError::Service(ServiceError::VectorIndex(err)) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Service(ServiceError::Store(content_store::StoreError::NotFound(key))) => {
                (StatusCode::NOT_FOUND, format!("object not found: {key}"))
            }
            ApiError::Service(ServiceError::Store(err)) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Service(ServiceError::InvalidRequest(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Service(ServiceError::Encoder(msg)) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Service(ServiceError::Fetch(err)) => (StatusCode::BAD_GATEWAY, err.to_string()),
            ApiError::Service(ServiceError::InvalidTransition(msg)) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Service(ServiceError::NotFound(what)) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Repo(err) => repo_status(err),
            ApiError::VectorIndex(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Store(content_store::StoreError::NotFound(key)) => {
                (StatusCode::NOT_FOUND, format!("object not found: {key}"))
            }
            ApiError::Store(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            ApiError::RateLimited(reason, _) => (StatusCode::TOO_MANY_REQUESTS, reason.clone()),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        }
    }
}

fn repo_status(err: &RepoError) -> (StatusCode, String) {
    match err {
        RepoError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
        RepoError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepoError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepoError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        if status >= StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %detail, "request failed");
        }
        let mut response = (status, Json(ApiResponse::<()>::error(detail))).into_response();
        if let ApiError::RateLimited(_, Some(retry_after)) = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}
