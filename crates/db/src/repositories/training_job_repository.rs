use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    training_job::{ModelType, TrainingJob, TrainingJobStatus, next_status},
};

pub struct TrainingJobRepository;

impl TrainingJobRepository {
    pub async fn create(
        pool: &SqlitePool,
        project_id: Uuid,
        dataset_version_id: Uuid,
        model_type: ModelType,
        base_model: &str,
        hyperparameters: serde_json::Value,
        total_epochs: i32,
    ) -> Result<TrainingJob, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, TrainingJob>(
            r#"
            INSERT INTO training_jobs (
                id, project_id, dataset_version_id, model_type, base_model, status,
                hyperparameters, current_epoch, total_epochs, created_at
            )
            VALUES (?, ?, ?, ?, ?, 'queued', ?, 0, ?, datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(project_id.as_bytes().as_slice())
        .bind(dataset_version_id.as_bytes().as_slice())
        .bind(model_type.to_string())
        .bind(base_model)
        .bind(sqlx::types::Json(hyperparameters))
        .bind(total_epochs)
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<TrainingJob>, RepoError> {
        sqlx::query_as::<Sqlite, TrainingJob>("SELECT * FROM training_jobs WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn list_for_project(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<TrainingJob>, RepoError> {
        sqlx::query_as::<Sqlite, TrainingJob>(
            "SELECT * FROM training_jobs WHERE project_id = ? ORDER BY created_at DESC",
        )
        .bind(project_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn transition(
        pool: &SqlitePool,
        id: Uuid,
        requested: TrainingJobStatus,
    ) -> Result<TrainingJob, RepoError> {
        let job = Self::find_by_id(pool, id).await?.ok_or(RepoError::NotFound("training_job"))?;
        let next = next_status(job.status, requested).map_err(RepoError::InvalidTransition)?;

        let set_started = next == TrainingJobStatus::Training && job.started_at.is_none();
        let set_completed = next.is_terminal();

        let sql = format!(
            "UPDATE training_jobs SET status = ?{}{} WHERE id = ? RETURNING *",
            if set_started { ", started_at = datetime('now')" } else { "" },
            if set_completed { ", completed_at = datetime('now')" } else { "" },
        );

        sqlx::query_as::<Sqlite, TrainingJob>(&sql)
            .bind(next.to_string())
            .bind(id.as_bytes().as_slice())
            .fetch_one(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn record_progress(
        pool: &SqlitePool,
        id: Uuid,
        current_epoch: i32,
        train_loss: Option<f64>,
        val_loss: Option<f64>,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE training_jobs SET current_epoch = ?, train_loss = ?, val_loss = ? WHERE id = ?")
            .bind(current_epoch)
            .bind(train_loss)
            .bind(val_loss)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn record_result(
        pool: &SqlitePool,
        id: Uuid,
        model_path: &str,
        metrics: serde_json::Value,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE training_jobs SET model_path = ?, metrics = ? WHERE id = ?")
            .bind(model_path)
            .bind(sqlx::types::Json(metrics))
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn record_failure(pool: &SqlitePool, id: Uuid, error_message: &str) -> Result<(), RepoError> {
        sqlx::query("UPDATE training_jobs SET error_message = ? WHERE id = ?")
            .bind(error_message)
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
