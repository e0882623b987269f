use db::models::training_job::{ModelType, TrainingJob, TrainingJobStatus};
use db::repositories::training_job_repository::TrainingJobRepository;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::ServiceError;

/// Required keys in a job's `hyperparameters` map, per `spec.md` §4.I.
pub const REQUIRED_HYPERPARAMETERS: [&str; 6] =
    ["epochs", "batch_size", "learning_rate", "optimizer", "weight_decay", "scheduler"];

pub struct TrainingController {
    pool: SqlitePool,
}

impl TrainingController {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a QUEUED job, soft-enforcing `max_concurrent_training_jobs`:
    /// dispatch is refused if the project already has that many jobs in
    /// PREPARING/TRAINING, but an operator may still queue ahead of that —
    /// the cap only blocks a *new* job from being picked up, not from being
    /// requested.
    pub async fn queue(
        &self,
        project_id: Uuid,
        dataset_version_id: Uuid,
        model_type: ModelType,
        base_model: Option<&str>,
        hyperparameters: Value,
        total_epochs: i32,
    ) -> Result<TrainingJob, ServiceError> {
        for key in REQUIRED_HYPERPARAMETERS {
            if hyperparameters.get(key).is_none() {
                return Err(ServiceError::InvalidRequest(format!("hyperparameters missing required key '{key}'")));
            }
        }

        let base_model = base_model.unwrap_or_else(|| model_type.default_base_model());
        if base_model.is_empty() && model_type == ModelType::Custom {
            return Err(ServiceError::InvalidRequest("custom model_type requires an explicit base_model".to_string()));
        }

        Ok(TrainingJobRepository::create(&self.pool, project_id, dataset_version_id, model_type, base_model, hyperparameters, total_epochs).await?)
    }

    /// Returns the count of jobs currently in PREPARING/TRAINING for a
    /// project, for a dispatcher to compare against `max_concurrent_training_jobs`
    /// before calling [`Self::advance`] on a QUEUED job.
    pub async fn active_count(&self, project_id: Uuid) -> Result<usize, ServiceError> {
        let jobs = TrainingJobRepository::list_for_project(&self.pool, project_id).await?;
        Ok(jobs
            .iter()
            .filter(|j| matches!(j.status, TrainingJobStatus::Preparing | TrainingJobStatus::Training))
            .count())
    }

    /// Applies one state transition. Progress updates (`TRAINING →
    /// TRAINING`) and terminal results are written by the caller via
    /// [`Self::record_progress`]/[`Self::record_result`] after this
    /// succeeds, mirroring the worker's "advance status, then report
    /// detail" write order.
    pub async fn advance(&self, job_id: Uuid, requested: TrainingJobStatus) -> Result<TrainingJob, ServiceError> {
        TrainingJobRepository::transition(&self.pool, job_id, requested).await.map_err(Into::into)
    }

    pub async fn record_progress(
        &self,
        job_id: Uuid,
        current_epoch: i32,
        train_loss: Option<f64>,
        val_loss: Option<f64>,
    ) -> Result<(), ServiceError> {
        TrainingJobRepository::record_progress(&self.pool, job_id, current_epoch, train_loss, val_loss).await?;
        Ok(())
    }

    pub async fn record_result(&self, job_id: Uuid, model_path: &str, metrics: Value) -> Result<(), ServiceError> {
        TrainingJobRepository::record_result(&self.pool, job_id, model_path, metrics).await?;
        Ok(())
    }

    /// Fails a job from any non-terminal state, recording `error_message`
    /// before the terminal transition so the message is visible even if
    /// the transition write and the detail write aren't atomic.
    pub async fn fail(&self, job_id: Uuid, error_message: &str) -> Result<TrainingJob, ServiceError> {
        TrainingJobRepository::record_failure(&self.pool, job_id, error_message).await?;
        self.advance(job_id, TrainingJobStatus::Failed).await
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<TrainingJob, ServiceError> {
        self.advance(job_id, TrainingJobStatus::Cancelled).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_hyperparameters_match_spec_list() {
        assert_eq!(REQUIRED_HYPERPARAMETERS.len(), 6);
        assert!(REQUIRED_HYPERPARAMETERS.contains(&"learning_rate"));
    }
}
