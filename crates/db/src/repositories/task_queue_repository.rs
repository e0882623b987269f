use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    task_queue::{QueuedTask, TaskKind},
};

pub struct TaskQueueRepository;

impl TaskQueueRepository {
    pub async fn enqueue(
        pool: &SqlitePool,
        project_id: Uuid,
        media_id: Uuid,
        kind: TaskKind,
        priority: i32,
        custom_prompt_id: Option<&str>,
    ) -> Result<QueuedTask, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, QueuedTask>(
            r#"
            INSERT INTO task_queue (
                id, project_id, media_id, kind, status, queue_name, priority,
                attempts, custom_prompt_id, created_at
            )
            VALUES (?, ?, ?, ?, 'pending', ?, ?, 0, ?, datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(project_id.as_bytes().as_slice())
        .bind(media_id.as_bytes().as_slice())
        .bind(kind.to_string())
        .bind(kind.queue_name())
        .bind(priority)
        .bind(custom_prompt_id)
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    /// Claims the single highest-priority pending task for `queue_name`,
    /// matching the prefetch=1 single-inflight contract. Uses a transaction
    /// so two workers racing on the same queue can't double-claim a row.
    pub async fn claim_next(pool: &SqlitePool, queue_name: &str) -> Result<Option<QueuedTask>, RepoError> {
        let mut tx = pool.begin().await.map_err(RepoError::Database)?;

        let candidate = sqlx::query_as::<Sqlite, QueuedTask>(
            r#"
            SELECT * FROM task_queue
            WHERE queue_name = ? AND status = 'pending'
            ORDER BY priority DESC, created_at ASC
            LIMIT 1
            "#,
        )
        .bind(queue_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepoError::Database)?;

        let Some(candidate) = candidate else {
            tx.commit().await.map_err(RepoError::Database)?;
            return Ok(None);
        };

        let claimed = sqlx::query_as::<Sqlite, QueuedTask>(
            r#"
            UPDATE task_queue SET status = 'claimed', attempts = attempts + 1, claimed_at = datetime('now')
            WHERE id = ? RETURNING *
            "#,
        )
        .bind(candidate.id.as_bytes().as_slice())
        .fetch_one(&mut *tx)
        .await
        .map_err(RepoError::Database)?;

        tx.commit().await.map_err(RepoError::Database)?;
        Ok(Some(claimed))
    }

    pub async fn ack(pool: &SqlitePool, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("UPDATE task_queue SET status = 'done' WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    /// Failing a task either requeues it as `pending` (if under the kind's
    /// `max_attempts`) or marks it terminally `failed` with `error_message`.
    pub async fn fail(pool: &SqlitePool, id: Uuid, error_message: &str) -> Result<QueuedTask, RepoError> {
        let task = sqlx::query_as::<Sqlite, QueuedTask>("SELECT * FROM task_queue WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)?
            .ok_or(RepoError::NotFound("task_queue"))?;

        let next_status = if (task.attempts as u32) < task.kind.max_attempts() {
            "pending"
        } else {
            "failed"
        };

        sqlx::query_as::<Sqlite, QueuedTask>(
            "UPDATE task_queue SET status = ?, error_message = ?, claimed_at = NULL WHERE id = ? RETURNING *",
        )
        .bind(next_status)
        .bind(error_message)
        .bind(id.as_bytes().as_slice())
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<QueuedTask>, RepoError> {
        sqlx::query_as::<Sqlite, QueuedTask>("SELECT * FROM task_queue WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn list_for_media(pool: &SqlitePool, media_id: Uuid) -> Result<Vec<QueuedTask>, RepoError> {
        sqlx::query_as::<Sqlite, QueuedTask>(
            "SELECT * FROM task_queue WHERE media_id = ? ORDER BY created_at ASC",
        )
        .bind(media_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }
}
