use db::models::media::EnrichmentState;
use db::models::task_queue::TaskKind;
use db::repositories::media_repository::MediaRepository;
use db::repositories::task_queue_repository::TaskQueueRepository;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::ServiceError;

const SWEEPER_BATCH_SIZE: i64 = 50;
const PROJECT_LIST_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    Clip,
    Dino,
    Vlm,
    Text,
}

impl Pipeline {
    fn task_kind(self) -> TaskKind {
        match self {
            Pipeline::Clip => TaskKind::ClipImage,
            Pipeline::Dino => TaskKind::DinoImage,
            Pipeline::Vlm => TaskKind::VlmCaption,
            Pipeline::Text => TaskKind::TextEmbedding,
        }
    }
}

pub const DEFAULT_PIPELINES: [Pipeline; 4] = [Pipeline::Clip, Pipeline::Dino, Pipeline::Vlm, Pipeline::Text];

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub job_id: Uuid,
    pub total_items: usize,
    pub total_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct IndexingStats {
    pub total: i64,
    pub indexed: i64,
    pub pending: i64,
    pub processing: i64,
    pub failed: i64,
    pub partial: i64,
}

pub struct Dispatcher {
    pool: SqlitePool,
}

impl Dispatcher {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Loads the dispatch target set (explicit `media_ids`, or every
    /// PENDING/FAILED item in the project), transitions all of them to
    /// PROCESSING in one pass, then enqueues one task per `(media,
    /// pipeline)` pair with GPU pipelines routed to the `"gpu"` queue.
    pub async fn dispatch(
        &self,
        project_id: Uuid,
        media_ids: Option<Vec<Uuid>>,
        pipelines: &[Pipeline],
        custom_prompt_id: Option<&str>,
        priority: i32,
    ) -> Result<DispatchResult, ServiceError> {
        let targets = match media_ids {
            Some(ids) => ids,
            None => {
                let mut all = Vec::new();
                let mut offset = 0;
                loop {
                    let page = MediaRepository::list_for_project(&self.pool, project_id, PROJECT_LIST_PAGE_SIZE, offset).await?;
                    if page.is_empty() {
                        break;
                    }
                    let page_len = page.len();
                    all.extend(page.into_iter().filter(|m| {
                        matches!(m.indexing_status, EnrichmentState::Pending | EnrichmentState::Failed)
                    }));
                    if (page_len as i64) < PROJECT_LIST_PAGE_SIZE {
                        break;
                    }
                    offset += PROJECT_LIST_PAGE_SIZE;
                }
                all.into_iter().map(|m| m.id).collect()
            }
        };

        for media_id in &targets {
            MediaRepository::set_indexing_status(&self.pool, *media_id, EnrichmentState::Processing).await?;
        }

        let mut total_tasks = 0;
        for media_id in &targets {
            for pipeline in pipelines {
                TaskQueueRepository::enqueue(&self.pool, project_id, *media_id, pipeline.task_kind(), priority, custom_prompt_id).await?;
                total_tasks += 1;
            }
        }

        Ok(DispatchResult { job_id: Uuid::new_v4(), total_items: targets.len(), total_tasks })
    }

    pub async fn stats(&self, project_id: Uuid) -> Result<IndexingStats, ServiceError> {
        let mut stats = IndexingStats::default();
        let mut offset = 0;
        loop {
            let page = MediaRepository::list_for_project(&self.pool, project_id, PROJECT_LIST_PAGE_SIZE, offset).await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            for media in &page {
                stats.total += 1;
                match media.indexing_status {
                    EnrichmentState::Completed => stats.indexed += 1,
                    EnrichmentState::Pending => stats.pending += 1,
                    EnrichmentState::Processing => stats.processing += 1,
                    EnrichmentState::Failed => stats.failed += 1,
                    EnrichmentState::Partial => stats.partial += 1,
                }
            }
            if (page_len as i64) < PROJECT_LIST_PAGE_SIZE {
                break;
            }
            offset += PROJECT_LIST_PAGE_SIZE;
        }
        Ok(stats)
    }

    /// Re-dispatches the minimum viable pipeline (CLIP only) for up to 50
    /// FAILED media in a project, to unblock retries. Must not touch
    /// anything already back in PROCESSING — callers run this on a timer,
    /// so a FAILED item picked up here and reprocessed by a worker before
    /// the next tick is simply skipped on the next sweep.
    pub async fn sweep_failed(&self, project_id: Uuid) -> Result<DispatchResult, ServiceError> {
        let mut candidates = Vec::new();
        let mut offset = 0;
        while candidates.len() < SWEEPER_BATCH_SIZE as usize {
            let page = MediaRepository::list_for_project(&self.pool, project_id, PROJECT_LIST_PAGE_SIZE, offset).await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            candidates.extend(
                page.into_iter()
                    .filter(|m| m.indexing_status == EnrichmentState::Failed)
                    .map(|m| m.id),
            );
            if (page_len as i64) < PROJECT_LIST_PAGE_SIZE {
                break;
            }
            offset += PROJECT_LIST_PAGE_SIZE;
        }
        candidates.truncate(SWEEPER_BATCH_SIZE as usize);

        if candidates.is_empty() {
            return Ok(DispatchResult { job_id: Uuid::new_v4(), total_items: 0, total_tasks: 0 });
        }

        self.dispatch(project_id, Some(candidates), &[Pipeline::Clip], None, 0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipelines_cover_all_four_kinds() {
        assert_eq!(DEFAULT_PIPELINES.len(), 4);
        assert_eq!(Pipeline::Clip.task_kind(), TaskKind::ClipImage);
        assert_eq!(Pipeline::Dino.task_kind(), TaskKind::DinoImage);
        assert_eq!(Pipeline::Vlm.task_kind(), TaskKind::VlmCaption);
        assert_eq!(Pipeline::Text.task_kind(), TaskKind::TextEmbedding);
    }
}
