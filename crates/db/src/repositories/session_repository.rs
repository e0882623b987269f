use chrono::{Duration, Utc};
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{RepoError, session::Session};

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        token_hash: &str,
        ttl_hours: i64,
    ) -> Result<Session, RepoError> {
        let id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::hours(ttl_hours);
        sqlx::query_as::<Sqlite, Session>(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
            VALUES (?, ?, ?, datetime('now'), ?)
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(user_id.as_bytes().as_slice())
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    /// Returns `None` for both a missing and an expired session; the caller
    /// doesn't need to distinguish the two, both mean "not authenticated".
    pub async fn find_active_by_token_hash(pool: &SqlitePool, token_hash: &str) -> Result<Option<Session>, RepoError> {
        sqlx::query_as::<Sqlite, Session>(
            "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn delete_by_token_hash(pool: &SqlitePool, token_hash: &str) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn delete_expired(pool: &SqlitePool) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM sessions WHERE expires_at <= datetime('now')")
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
