use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    media_source::{MediaSource, NewMediaSource},
};

pub struct MediaSourceRepository;

impl MediaSourceRepository {
    pub async fn create(pool: &SqlitePool, new: NewMediaSource) -> Result<MediaSource, RepoError> {
        let id = Uuid::new_v4();
        let content_hash = new.content.as_deref().map(|c| {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest(c.as_bytes()))
        });
        sqlx::query_as::<Sqlite, MediaSource>(
            r#"
            INSERT INTO media_sources (id, media_id, source_type, url, content, content_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(new.media_id.as_bytes().as_slice())
        .bind(&new.source_type)
        .bind(&new.url)
        .bind(&new.content)
        .bind(content_hash)
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn list_for_media(pool: &SqlitePool, media_id: Uuid) -> Result<Vec<MediaSource>, RepoError> {
        sqlx::query_as::<Sqlite, MediaSource>(
            "SELECT * FROM media_sources WHERE media_id = ? ORDER BY created_at ASC",
        )
        .bind(media_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn record_text_embedding(
        pool: &SqlitePool,
        id: Uuid,
        text_embedding_id: &str,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE media_sources SET text_embedding_id = ? WHERE id = ?")
            .bind(text_embedding_id)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
