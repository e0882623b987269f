use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{RepoError, user::User};

pub struct UserRepository;

impl UserRepository {
    pub async fn create(
        pool: &SqlitePool,
        email: &str,
        password_hash: &str,
        display_name: &str,
    ) -> Result<User, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, User>(
            r#"
            INSERT INTO users (id, email, password_hash, display_name, is_active, is_superuser, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, 0, datetime('now'), datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(format!("email already registered: {email}"))
            }
            other => RepoError::Database(other),
        })
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<Sqlite, User>("SELECT * FROM users WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<Sqlite, User>("SELECT * FROM users WHERE email = ? AND is_active = 1")
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn set_active(pool: &SqlitePool, id: Uuid, is_active: bool) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET is_active = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(is_active)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
