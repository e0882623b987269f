//! Project CRUD and membership management.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use db::models::project::{NewProject, Project};
use db::models::project_member::{ProjectMember, ProjectRole};
use db::repositories::{ProjectMemberRepository, ProjectRepository};
use serde::Deserialize;
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list).post(create))
        .route("/projects/{id}", get(get_one).delete(remove))
        .route("/projects/{id}/members", get(list_members).post(add_member))
        .route("/projects/{id}/members/{user_id}", post(update_member).delete(remove_member))
}

#[derive(Debug, Deserialize)]
struct CreateProjectRequest {
    slug: String,
    name: String,
    #[serde(default)]
    settings: serde_json::Value,
}

async fn create(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<ApiResponse<Project>>, ApiError> {
    access.require_active()?;
    let project = ProjectRepository::create(
        &state.pool,
        NewProject { slug: body.slug, name: body.name, settings: body.settings },
        access.user_id,
    )
    .await?;
    Ok(Json(ApiResponse::ok(project)))
}

async fn list(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
) -> Result<Json<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = ProjectRepository::list_for_user(&state.pool, access.user_id).await?;
    Ok(Json(ApiResponse::ok(projects)))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Project>>, ApiError> {
    access.check_project_access(&state.pool, id, ProjectRole::Viewer).await?;
    let project = ProjectRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("project"))?;
    Ok(Json(ApiResponse::ok(project)))
}

async fn remove(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    access.check_project_access(&state.pool, id, ProjectRole::Owner).await?;
    ProjectRepository::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AddMemberRequest {
    user_id: Uuid,
    role: ProjectRole,
}

async fn list_members(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ProjectMember>>>, ApiError> {
    access.check_project_access(&state.pool, id, ProjectRole::Viewer).await?;
    let members = ProjectMemberRepository::list_for_project(&state.pool, id).await?;
    Ok(Json(ApiResponse::ok(members)))
}

async fn add_member(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> Result<Json<ApiResponse<ProjectMember>>, ApiError> {
    access.check_project_access(&state.pool, id, ProjectRole::Admin).await?;
    let member = ProjectMemberRepository::add(&state.pool, id, body.user_id, body.role).await?;
    Ok(Json(ApiResponse::ok(member)))
}

#[derive(Debug, Deserialize)]
struct UpdateMemberRequest {
    role: ProjectRole,
}

async fn update_member(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateMemberRequest>,
) -> Result<StatusCode, ApiError> {
    access.check_project_access(&state.pool, id, ProjectRole::Admin).await?;
    ProjectMemberRepository::update_role(&state.pool, id, user_id, body.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_member(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    access.check_project_access(&state.pool, id, ProjectRole::Admin).await?;
    ProjectMemberRepository::remove(&state.pool, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
