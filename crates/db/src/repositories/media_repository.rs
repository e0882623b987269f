use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    media::{EnrichmentState, Media, NewMedia},
};

pub struct MediaRepository;

impl MediaRepository {
    pub async fn create(pool: &SqlitePool, new: NewMedia) -> Result<Media, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, Media>(
            r#"
            INSERT INTO media (
                id, project_id, filename, kind, mime_type, size_bytes, checksum_sha256,
                storage_path, thumbnail_path, width, height, duration_sec, fps,
                indexing_status, auto_tags, tags, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?, ?, 'pending', '[]', '[]', datetime('now'), datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(new.project_id.as_bytes().as_slice())
        .bind(&new.filename)
        .bind(new.kind.to_string())
        .bind(&new.mime_type)
        .bind(new.size_bytes)
        .bind(&new.checksum_sha256)
        .bind(&new.storage_path)
        .bind(new.width)
        .bind(new.height)
        .bind(new.duration_sec)
        .bind(new.fps)
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Media>, RepoError> {
        sqlx::query_as::<Sqlite, Media>("SELECT * FROM media WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn find_by_checksum(
        pool: &SqlitePool,
        project_id: Uuid,
        checksum_sha256: &str,
    ) -> Result<Option<Media>, RepoError> {
        sqlx::query_as::<Sqlite, Media>(
            "SELECT * FROM media WHERE project_id = ? AND checksum_sha256 = ?",
        )
        .bind(project_id.as_bytes().as_slice())
        .bind(checksum_sha256)
        .fetch_optional(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn list_for_project(
        pool: &SqlitePool,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Media>, RepoError> {
        sqlx::query_as::<Sqlite, Media>(
            "SELECT * FROM media WHERE project_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(project_id.as_bytes().as_slice())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn set_indexing_status(
        pool: &SqlitePool,
        id: Uuid,
        status: EnrichmentState,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE media SET indexing_status = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(status.to_string())
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn record_clip_embedding(
        pool: &SqlitePool,
        id: Uuid,
        clip_embedding_id: &str,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE media SET clip_embedding_id = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(clip_embedding_id)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn record_dino_embedding(
        pool: &SqlitePool,
        id: Uuid,
        dino_embedding_id: &str,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE media SET dino_embedding_id = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(dino_embedding_id)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn record_caption(
        pool: &SqlitePool,
        id: Uuid,
        caption: &str,
        auto_tags: &[String],
    ) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE media SET auto_caption = ?, auto_tags = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(caption)
        .bind(sqlx::types::Json(auto_tags))
        .bind(id.as_bytes().as_slice())
        .execute(pool)
        .await
        .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn record_custom_indexing_result(
        pool: &SqlitePool,
        id: Uuid,
        result: serde_json::Value,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE media SET custom_indexing_results = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(sqlx::types::Json(result))
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn record_text_embedding(
        pool: &SqlitePool,
        id: Uuid,
        text_embedding_id: &str,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE media SET text_embedding_id = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(text_embedding_id)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
