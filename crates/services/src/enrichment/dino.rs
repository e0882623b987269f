use std::sync::Arc;

use content_store::{Bucket, Store};
use db::models::media::MediaKind;
use db::repositories::media_repository::MediaRepository;
use sqlx::SqlitePool;
use uuid::Uuid;
use vector_index::{EmbeddingPoint, VectorIndex, VectorSpace};

use crate::encoders::DinoImageEncoder;
use crate::enrichment::{WorkerOutcome, deterministic_point_id};
use crate::error::ServiceError;

/// Same contract as [`super::clip::ClipImageWorker`] but IMAGE only — no
/// video-keyframe fallback, since DINO's self-supervised embedding is used
/// for still-image visual similarity.
pub struct DinoImageWorker {
    pool: SqlitePool,
    store: Arc<dyn Store>,
    index: Arc<VectorIndex>,
    encoder: Arc<dyn DinoImageEncoder>,
}

impl DinoImageWorker {
    pub fn new(pool: SqlitePool, store: Arc<dyn Store>, index: Arc<VectorIndex>, encoder: Arc<dyn DinoImageEncoder>) -> Self {
        Self { pool, store, index, encoder }
    }

    pub async fn process(&self, project_id: Uuid, media_id: Uuid) -> Result<WorkerOutcome, ServiceError> {
        let media = MediaRepository::find_by_id(&self.pool, media_id).await?.ok_or(ServiceError::NotFound("media"))?;

        if media.kind != MediaKind::Image {
            return Ok(WorkerOutcome::Skipped { reason: "dino_image only applies to image media" });
        }

        let bytes = self.store.get(Bucket::Media, &media.storage_path).await?;
        let vector = self.encoder.encode_image(&bytes).await?;

        let label = format!("dino_{media_id}");
        let point_id = deterministic_point_id(&label);
        self.index
            .upsert(
                VectorSpace::Dino,
                EmbeddingPoint { id: point_id, vector, project_id, media_id, media_type: media.kind.to_string(), extra_payload: None },
            )
            .await?;

        MediaRepository::record_dino_embedding(&self.pool, media_id, &label).await?;
        Ok(WorkerOutcome::Completed)
    }
}
