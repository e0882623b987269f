use std::sync::Arc;

use content_store::{Bucket, Store};
use db::models::media::MediaKind;
use db::repositories::media_repository::MediaRepository;
use sqlx::SqlitePool;
use uuid::Uuid;
use vector_index::{EmbeddingPoint, VectorIndex, VectorSpace};

use crate::encoders::ClipImageEncoder;
use crate::enrichment::{WorkerOutcome, deterministic_point_id};
use crate::error::ServiceError;

/// Extracts a single representative frame from a video, since the CLIP
/// worker treats video as "one image": its middle keyframe.
#[async_trait::async_trait]
pub trait KeyframeExtractor: Send + Sync {
    async fn extract_middle_keyframe(&self, video_bytes: &[u8]) -> Result<Vec<u8>, ServiceError>;
}

pub struct ClipImageWorker {
    pool: SqlitePool,
    store: Arc<dyn Store>,
    index: Arc<VectorIndex>,
    encoder: Arc<dyn ClipImageEncoder>,
    keyframes: Arc<dyn KeyframeExtractor>,
}

impl ClipImageWorker {
    pub fn new(
        pool: SqlitePool,
        store: Arc<dyn Store>,
        index: Arc<VectorIndex>,
        encoder: Arc<dyn ClipImageEncoder>,
        keyframes: Arc<dyn KeyframeExtractor>,
    ) -> Self {
        Self { pool, store, index, encoder, keyframes }
    }

    pub async fn process(&self, project_id: Uuid, media_id: Uuid) -> Result<WorkerOutcome, ServiceError> {
        let media = MediaRepository::find_by_id(&self.pool, media_id).await?.ok_or(ServiceError::NotFound("media"))?;

        let source_bytes = self.store.get(Bucket::Media, &media.storage_path).await?;
        let image_bytes = match media.kind {
            MediaKind::Image => source_bytes,
            MediaKind::Video => match self.keyframes.extract_middle_keyframe(&source_bytes).await {
                Ok(frame) => frame,
                Err(err) => return Ok(WorkerOutcome::Failed { error: err.to_string() }),
            },
            _ => return Ok(WorkerOutcome::Skipped { reason: "clip_image only applies to image/video media" }),
        };

        let mut vector = self.encoder.encode_image(&image_bytes).await?;
        unit_normalize(&mut vector);

        let label = format!("clip_{media_id}");
        let point_id = deterministic_point_id(&label);
        self.index
            .upsert(
                VectorSpace::Clip,
                EmbeddingPoint { id: point_id, vector, project_id, media_id, media_type: media.kind.to_string(), extra_payload: None },
            )
            .await?;

        MediaRepository::record_clip_embedding(&self.pool, media_id, &label).await?;
        Ok(WorkerOutcome::Completed)
    }
}

fn unit_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_normalize_scales_to_unit_length() {
        let mut v = vec![3.0, 4.0];
        unit_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unit_normalize_leaves_zero_vector_untouched() {
        let mut v = vec![0.0, 0.0];
        unit_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
