use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    annotation::{Annotation, NewAnnotation},
};

pub struct AnnotationRepository;

impl AnnotationRepository {
    pub async fn create(pool: &SqlitePool, new: NewAnnotation) -> Result<Annotation, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, Annotation>(
            r#"
            INSERT INTO annotations (
                id, dataset_item_id, user_id, annotation_type, label, confidence,
                geometry, attributes, frame_or_time, source, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(new.dataset_item_id.as_bytes().as_slice())
        .bind(new.user_id.as_bytes().as_slice())
        .bind(new.annotation_type.to_string())
        .bind(&new.label)
        .bind(new.confidence)
        .bind(sqlx::types::Json(new.geometry))
        .bind(sqlx::types::Json(new.attributes))
        .bind(new.frame_or_time)
        .bind(new.source.to_string())
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Annotation>, RepoError> {
        sqlx::query_as::<Sqlite, Annotation>("SELECT * FROM annotations WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn list_for_item(pool: &SqlitePool, dataset_item_id: Uuid) -> Result<Vec<Annotation>, RepoError> {
        sqlx::query_as::<Sqlite, Annotation>(
            "SELECT * FROM annotations WHERE dataset_item_id = ? ORDER BY created_at ASC",
        )
        .bind(dataset_item_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Annotation>, RepoError> {
        sqlx::query_as::<Sqlite, Annotation>(
            "SELECT * FROM annotations WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn update_geometry(
        pool: &SqlitePool,
        id: Uuid,
        geometry: serde_json::Value,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE annotations SET geometry = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(sqlx::types::Json(geometry))
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM annotations WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
