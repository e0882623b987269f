use std::sync::Arc;

use content_store::{Bucket, Store};
use db::models::media::{EnrichmentState, MediaKind};
use db::models::task_queue::TaskStatus;
use db::repositories::media_repository::MediaRepository;
use db::repositories::task_queue_repository::TaskQueueRepository;
use sqlx::SqlitePool;
use uuid::Uuid;
use vector_index::{EmbeddingPoint, VectorIndex, VectorSpace};

use crate::encoders::{TextEncoder, VlmCaptioner};
use crate::enrichment::{WorkerOutcome, deterministic_point_id};
use crate::error::ServiceError;

pub struct VlmCaptionWorker {
    pool: SqlitePool,
    store: Arc<dyn Store>,
    index: Arc<VectorIndex>,
    captioner: Arc<dyn VlmCaptioner>,
    text_encoder: Arc<dyn TextEncoder>,
}

impl VlmCaptionWorker {
    pub fn new(
        pool: SqlitePool,
        store: Arc<dyn Store>,
        index: Arc<VectorIndex>,
        captioner: Arc<dyn VlmCaptioner>,
        text_encoder: Arc<dyn TextEncoder>,
    ) -> Self {
        Self { pool, store, index, captioner, text_encoder }
    }

    pub async fn process(
        &self,
        project_id: Uuid,
        media_id: Uuid,
        custom_prompt: Option<(&str, &str)>,
    ) -> Result<WorkerOutcome, ServiceError> {
        let media = MediaRepository::find_by_id(&self.pool, media_id).await?.ok_or(ServiceError::NotFound("media"))?;

        if media.kind != MediaKind::Image {
            return Ok(WorkerOutcome::Skipped { reason: "vlm_caption only applies to image media" });
        }

        let bytes = self.store.get(Bucket::Media, &media.storage_path).await?;
        let (caption, tags) = self.captioner.caption_and_tag(&bytes).await?;

        if let Some((prompt_name, prompt)) = custom_prompt {
            let result = self.captioner.run_custom_prompt(&bytes, prompt).await?;
            MediaRepository::record_custom_indexing_result(
                &self.pool,
                media_id,
                serde_json::json!({ "prompt_name": prompt_name, "prompt": prompt, "result": result }),
            )
            .await?;
        }

        MediaRepository::record_caption(&self.pool, media_id, &caption, &tags).await?;

        let composed = if tags.is_empty() {
            caption.clone()
        } else {
            format!("{caption}. Tags: {}", tags.join(", "))
        };
        let vector = self.text_encoder.encode_text(&composed).await?;

        let label = format!("caption_{media_id}");
        let point_id = deterministic_point_id(&label);
        self.index
            .upsert(
                VectorSpace::Text,
                EmbeddingPoint { id: point_id, vector, project_id, media_id, media_type: media.kind.to_string(), extra_payload: None },
            )
            .await?;

        if self.all_pipelines_done(media_id).await? {
            MediaRepository::set_indexing_status(&self.pool, media_id, EnrichmentState::Completed).await?;
        }

        Ok(WorkerOutcome::Completed)
    }

    /// The VLM task is, in practice, the last write for an item's enabled
    /// pipelines — check the task queue rather than assume task order.
    async fn all_pipelines_done(&self, media_id: Uuid) -> Result<bool, ServiceError> {
        let tasks = TaskQueueRepository::list_for_media(&self.pool, media_id).await?;
        Ok(tasks.iter().all(|t| matches!(t.status, TaskStatus::Done | TaskStatus::Failed)))
    }
}
