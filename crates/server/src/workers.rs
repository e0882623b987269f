//! Background enrichment workers: one task per queue (`gpu`, `default`),
//! each single-inflight per `SPEC_FULL.md` §5 (claim one task, run it to
//! completion, then claim the next — no concurrent claims on one worker).

use std::time::Duration;

use db::models::task_queue::TaskKind;
use db::repositories::task_queue_repository::TaskQueueRepository;
use services::enrichment::WorkerOutcome;

use crate::state::AppState;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub fn spawn(state: AppState) {
    tokio::spawn(run_queue(state.clone(), "gpu"));
    tokio::spawn(run_queue(state, "default"));
}

async fn run_queue(state: AppState, queue_name: &'static str) {
    loop {
        match TaskQueueRepository::claim_next(&state.pool, queue_name).await {
            Ok(Some(task)) => {
                let failure = match run_task(&state, task.kind, task.project_id, task.media_id).await {
                    Ok(WorkerOutcome::Completed) | Ok(WorkerOutcome::Skipped { .. }) => None,
                    Ok(WorkerOutcome::Failed { error }) => Some(error),
                    Err(err) => Some(err.to_string()),
                };
                let ack_result = match failure {
                    None => TaskQueueRepository::ack(&state.pool, task.id).await.map(|_| ()),
                    Some(error) => TaskQueueRepository::fail(&state.pool, task.id, &error).await.map(|_| ()),
                };
                if let Err(err) = ack_result {
                    tracing::error!(%err, task_id = %task.id, "failed to record task outcome");
                }
            }
            Ok(None) => tokio::time::sleep(POLL_INTERVAL).await,
            Err(err) => {
                tracing::error!(%err, queue = queue_name, "failed to claim next task");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }
}

async fn run_task(
    state: &AppState,
    kind: TaskKind,
    project_id: uuid::Uuid,
    media_id: uuid::Uuid,
) -> Result<WorkerOutcome, services::ServiceError> {
    match kind {
        TaskKind::ClipImage => state.clip_worker.process(project_id, media_id).await,
        TaskKind::DinoImage => state.dino_worker.process(project_id, media_id).await,
        TaskKind::VlmCaption => state.vlm_worker.process(project_id, media_id, None).await,
        TaskKind::TextEmbedding => state.text_worker.process(project_id, media_id).await,
        TaskKind::Augmentation => Ok(WorkerOutcome::Skipped { reason: "augmentation runs via its own endpoint, not the task queue" }),
    }
}
