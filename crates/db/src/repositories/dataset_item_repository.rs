use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    dataset_item::{DatasetItem, Split},
};

pub struct DatasetItemRepository;

impl DatasetItemRepository {
    pub async fn add_media(
        pool: &SqlitePool,
        dataset_id: Uuid,
        media_id: Uuid,
        split: Split,
    ) -> Result<DatasetItem, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, DatasetItem>(
            r#"
            INSERT INTO dataset_items (id, dataset_id, media_id, split, priority, is_annotated, created_at)
            VALUES (?, ?, ?, ?, 0, 0, datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(dataset_id.as_bytes().as_slice())
        .bind(media_id.as_bytes().as_slice())
        .bind(split.to_string())
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict("media already belongs to this dataset".to_string())
            }
            other => RepoError::Database(other),
        })
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<DatasetItem>, RepoError> {
        sqlx::query_as::<Sqlite, DatasetItem>("SELECT * FROM dataset_items WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn list_for_dataset(
        pool: &SqlitePool,
        dataset_id: Uuid,
        split: Option<Split>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DatasetItem>, RepoError> {
        match split {
            Some(split) => sqlx::query_as::<Sqlite, DatasetItem>(
                "SELECT * FROM dataset_items WHERE dataset_id = ? AND split = ? ORDER BY priority DESC, created_at ASC LIMIT ? OFFSET ?",
            )
            .bind(dataset_id.as_bytes().as_slice())
            .bind(split.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await,
            None => sqlx::query_as::<Sqlite, DatasetItem>(
                "SELECT * FROM dataset_items WHERE dataset_id = ? ORDER BY priority DESC, created_at ASC LIMIT ? OFFSET ?",
            )
            .bind(dataset_id.as_bytes().as_slice())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await,
        }
        .map_err(RepoError::Database)
    }

    /// Unannotated items ordered by priority, for the active-learning queue.
    pub async fn next_unannotated(
        pool: &SqlitePool,
        dataset_id: Uuid,
        limit: i64,
    ) -> Result<Vec<DatasetItem>, RepoError> {
        sqlx::query_as::<Sqlite, DatasetItem>(
            "SELECT * FROM dataset_items WHERE dataset_id = ? AND is_annotated = 0 ORDER BY priority DESC, created_at ASC LIMIT ?",
        )
        .bind(dataset_id.as_bytes().as_slice())
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn set_priority(pool: &SqlitePool, id: Uuid, priority: i32) -> Result<(), RepoError> {
        sqlx::query("UPDATE dataset_items SET priority = ? WHERE id = ?")
            .bind(priority)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn set_annotated(pool: &SqlitePool, id: Uuid, is_annotated: bool) -> Result<(), RepoError> {
        sqlx::query("UPDATE dataset_items SET is_annotated = ? WHERE id = ?")
            .bind(is_annotated)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn assign(pool: &SqlitePool, id: Uuid, assignee_id: Option<Uuid>) -> Result<(), RepoError> {
        sqlx::query("UPDATE dataset_items SET assignee_id = ? WHERE id = ?")
            .bind(assignee_id.map(|u| u.simple().to_string()))
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
