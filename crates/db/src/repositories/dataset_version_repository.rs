use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    dataset_version::{DatasetVersion, ManifestItem, is_valid_version_tag},
};

pub struct DatasetVersionRepository;

impl DatasetVersionRepository {
    pub async fn create(
        pool: &SqlitePool,
        dataset_id: Uuid,
        tag: &str,
        manifest: Vec<ManifestItem>,
        stats: serde_json::Value,
    ) -> Result<DatasetVersion, RepoError> {
        if !is_valid_version_tag(tag) {
            return Err(RepoError::Conflict(format!("invalid version tag: {tag}")));
        }
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, DatasetVersion>(
            r#"
            INSERT INTO dataset_versions (id, dataset_id, tag, manifest, stats, created_at)
            VALUES (?, ?, ?, ?, ?, datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(dataset_id.as_bytes().as_slice())
        .bind(tag)
        .bind(sqlx::types::Json(manifest))
        .bind(sqlx::types::Json(stats))
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(format!("tag already exists for this dataset: {tag}"))
            }
            other => RepoError::Database(other),
        })
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<DatasetVersion>, RepoError> {
        sqlx::query_as::<Sqlite, DatasetVersion>("SELECT * FROM dataset_versions WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn find_by_tag(
        pool: &SqlitePool,
        dataset_id: Uuid,
        tag: &str,
    ) -> Result<Option<DatasetVersion>, RepoError> {
        sqlx::query_as::<Sqlite, DatasetVersion>(
            "SELECT * FROM dataset_versions WHERE dataset_id = ? AND tag = ?",
        )
        .bind(dataset_id.as_bytes().as_slice())
        .bind(tag)
        .fetch_optional(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn list_for_dataset(pool: &SqlitePool, dataset_id: Uuid) -> Result<Vec<DatasetVersion>, RepoError> {
        sqlx::query_as::<Sqlite, DatasetVersion>(
            "SELECT * FROM dataset_versions WHERE dataset_id = ? ORDER BY created_at DESC",
        )
        .bind(dataset_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn record_export(
        pool: &SqlitePool,
        id: Uuid,
        export_path: &str,
        export_format: &str,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE dataset_versions SET export_path = ?, export_format = ? WHERE id = ?")
            .bind(export_path)
            .bind(export_format)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
