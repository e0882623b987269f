use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::models::project_member::ProjectRole;
use db::repositories::{ProjectMemberRepository, SessionRepository, UserRepository};
use db::services::AuthService;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone)]
pub struct AccessContext {
    pub user_id: Uuid,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl AccessContext {
    pub fn require_superuser(&self) -> Result<(), ApiError> {
        if !self.is_active {
            return Err(ApiError::Forbidden);
        }
        if !self.is_superuser {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }

    pub fn require_active(&self) -> Result<(), ApiError> {
        if !self.is_active {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }

    /// Superusers are granted an implicit `Owner` role on every project.
    /// Otherwise the caller must hold project membership satisfying
    /// `required`, per the role hierarchy in `ProjectRole::satisfies`.
    pub async fn check_project_access(
        &self,
        pool: &sqlx::SqlitePool,
        project_id: Uuid,
        required: ProjectRole,
    ) -> Result<ProjectRole, ApiError> {
        if self.is_superuser {
            return Ok(ProjectRole::Owner);
        }

        let member = ProjectMemberRepository::find(pool, project_id, self.user_id).await?;
        match member {
            Some(m) if m.role.satisfies(required) => Ok(m.role),
            Some(_) => Err(ApiError::Forbidden),
            None => Err(ApiError::Forbidden),
        }
    }

    pub async fn get_project_role(&self, pool: &sqlx::SqlitePool, project_id: Uuid) -> Result<Option<ProjectRole>, ApiError> {
        if self.is_superuser {
            return Ok(Some(ProjectRole::Owner));
        }
        Ok(ProjectMemberRepository::find(pool, project_id, self.user_id).await?.map(|m| m.role))
    }
}

/// Resolves the caller's identity from either a `session_id` cookie or a
/// `Bearer` token, both stored as SHA256 hashes in the `sessions` table.
pub async fn get_current_user(state: &AppState, auth_header: Option<&str>, cookie_header: Option<&str>) -> Result<AccessContext, ApiError> {
    let raw_token = cookie_header
        .and_then(extract_session_from_cookies)
        .or_else(|| auth_header.and_then(|h| h.strip_prefix("Bearer ")).map(str::to_string));

    let Some(raw_token) = raw_token else {
        return Err(ApiError::Unauthorized);
    };

    let token_hash = AuthService::hash_session_token(&raw_token);
    let session = SessionRepository::find_active_by_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let user = UserRepository::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(AccessContext { user_id: user.id, is_superuser: user.is_superuser, is_active: user.is_active })
}

fn extract_session_from_cookies(cookie_header: &str) -> Option<String> {
    cookie_header.split(';').find_map(|cookie| {
        let (name, value) = cookie.trim().split_once('=')?;
        (name == "session_id").then(|| value.to_string())
    })
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let auth_header = req.headers().get("authorization").and_then(|h| h.to_str().ok());
    let cookie_header = req.headers().get("cookie").and_then(|h| h.to_str().ok());

    match get_current_user(&state, auth_header, cookie_header).await {
        Ok(context) if context.is_active => {
            req.extensions_mut().insert(context);
            Ok(next.run(req).await)
        }
        Ok(_) => Err(StatusCode::FORBIDDEN),
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

pub async fn require_superuser(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let auth_header = req.headers().get("authorization").and_then(|h| h.to_str().ok());
    let cookie_header = req.headers().get("cookie").and_then(|h| h.to_str().ok());

    match get_current_user(&state, auth_header, cookie_header).await {
        Ok(context) if context.require_superuser().is_ok() => {
            req.extensions_mut().insert(context);
            Ok(next.run(req).await)
        }
        Ok(_) => Err(StatusCode::FORBIDDEN),
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_session_id_from_cookie_header() {
        let header = "foo=bar; session_id=abc123; other=1";
        assert_eq!(extract_session_from_cookies(header), Some("abc123".to_string()));
    }

    #[test]
    fn missing_session_cookie_returns_none() {
        assert_eq!(extract_session_from_cookies("foo=bar"), None);
    }
}
