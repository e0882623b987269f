use axum::{Router, middleware};

use crate::{middleware as app_middleware, state::AppState};

pub mod active_learning;
pub mod annotations;
pub mod auth;
pub mod augmentation;
pub mod billing;
pub mod collaboration;
pub mod datasets;
pub mod health;
pub mod indexing;
pub mod media;
pub mod projects;
pub mod quality;
pub mod search;
pub mod training;
pub mod users;

/// Assembles the full API router: public auth endpoints, then every
/// session-gated module behind [`app_middleware::require_auth`], wrapped
/// in the request-id and security-header layers that apply to every
/// response regardless of auth outcome.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(projects::router())
        .merge(media::router())
        .merge(datasets::router())
        .merge(annotations::router())
        .merge(search::router())
        .merge(indexing::router())
        .merge(active_learning::router())
        .merge(quality::router())
        .merge(augmentation::router())
        .merge(training::router())
        .merge(billing::router())
        .merge(collaboration::router())
        .layer(middleware::from_fn_with_state(state.clone(), app_middleware::require_auth));

    let public = Router::new().merge(auth::public_router());

    let api = Router::new().merge(public).merge(protected);

    Router::new()
        .merge(health::router())
        .nest("/api", api)
        .layer(middleware::from_fn(app_middleware::security_headers))
        .layer(middleware::from_fn(app_middleware::request_id_middleware))
        .with_state(state)
}
