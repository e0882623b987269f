use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    dataset::{Dataset, DatasetStatus, NewDataset},
};

pub struct DatasetRepository;

impl DatasetRepository {
    pub async fn create(pool: &SqlitePool, new: NewDataset) -> Result<Dataset, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, Dataset>(
            r#"
            INSERT INTO datasets (
                id, project_id, slug, name, dataset_type, status, label_schema,
                train_ratio, val_ratio, test_ratio, item_count, annotated_count,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 'draft', ?, ?, ?, ?, 0, 0, datetime('now'), datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(new.project_id.as_bytes().as_slice())
        .bind(&new.slug)
        .bind(&new.name)
        .bind(new.dataset_type.to_string())
        .bind(sqlx::types::Json(new.label_schema))
        .bind(new.train_ratio)
        .bind(new.val_ratio)
        .bind(new.test_ratio)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(format!("slug already in use: {}", new.slug))
            }
            other => RepoError::Database(other),
        })
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Dataset>, RepoError> {
        sqlx::query_as::<Sqlite, Dataset>("SELECT * FROM datasets WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn list_for_project(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<Dataset>, RepoError> {
        sqlx::query_as::<Sqlite, Dataset>(
            "SELECT * FROM datasets WHERE project_id = ? ORDER BY created_at DESC",
        )
        .bind(project_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn set_status(pool: &SqlitePool, id: Uuid, status: DatasetStatus) -> Result<(), RepoError> {
        sqlx::query("UPDATE datasets SET status = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(status.to_string())
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn refresh_counts(pool: &SqlitePool, id: Uuid) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE datasets SET
                item_count = (SELECT COUNT(*) FROM dataset_items WHERE dataset_id = ?),
                annotated_count = (SELECT COUNT(*) FROM dataset_items WHERE dataset_id = ? AND is_annotated = 1),
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(id.as_bytes().as_slice())
        .bind(id.as_bytes().as_slice())
        .execute(pool)
        .await
        .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM datasets WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
