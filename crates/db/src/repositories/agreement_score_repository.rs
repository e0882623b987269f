use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{RepoError, agreement_score::AgreementScore};

pub struct AgreementScoreRepository;

impl AgreementScoreRepository {
    pub async fn record(
        pool: &SqlitePool,
        dataset_id: Uuid,
        dataset_item_id: Uuid,
        annotator_ids: Vec<Uuid>,
        metric: &str,
        score: f64,
        per_label_details: serde_json::Value,
    ) -> Result<AgreementScore, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, AgreementScore>(
            r#"
            INSERT INTO agreement_scores (
                id, dataset_id, dataset_item_id, annotator_ids, metric, score, per_label_details, computed_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(dataset_id.as_bytes().as_slice())
        .bind(dataset_item_id.as_bytes().as_slice())
        .bind(sqlx::types::Json(annotator_ids))
        .bind(metric)
        .bind(score)
        .bind(sqlx::types::Json(per_label_details))
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn list_for_dataset(pool: &SqlitePool, dataset_id: Uuid) -> Result<Vec<AgreementScore>, RepoError> {
        sqlx::query_as::<Sqlite, AgreementScore>(
            "SELECT * FROM agreement_scores WHERE dataset_id = ? ORDER BY computed_at DESC",
        )
        .bind(dataset_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn latest_for_item(
        pool: &SqlitePool,
        dataset_item_id: Uuid,
    ) -> Result<Option<AgreementScore>, RepoError> {
        sqlx::query_as::<Sqlite, AgreementScore>(
            "SELECT * FROM agreement_scores WHERE dataset_item_id = ? ORDER BY computed_at DESC LIMIT 1",
        )
        .bind(dataset_item_id.as_bytes().as_slice())
        .fetch_optional(pool)
        .await
        .map_err(RepoError::Database)
    }
}
