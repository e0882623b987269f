//! Enrichment workers: the four unchanged kinds from `spec.md` §4.D (CLIP
//! image, DINO image, VLM captioning, text embedding) plus the augmentation
//! supplement. Each worker claims one task from the `task_queue` table and
//! reports back success/failure via the same discipline: effect (blob
//! write, vector upsert, media-row column write) happens before the
//! status write that would let the row be seen as complete.

pub mod augmentation;
pub mod clip;
pub mod dino;
pub mod text_embedding;
pub mod vlm;

pub use augmentation::AugmentationWorker;
pub use clip::ClipImageWorker;
pub use dino::DinoImageWorker;
pub use text_embedding::TextEmbeddingWorker;
pub use vlm::VlmCaptionWorker;

/// Outcome of a single worker invocation against one claimed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed,
    Skipped { reason: &'static str },
    Failed { error: String },
}

/// Qdrant point ids must be a UUID or an integer, not an arbitrary string,
/// so the human-readable labels named in `spec.md` §4.D (`"clip_{media_id}"`,
/// `"caption_{media_id}"`, `"aug_{base_media_id}_{transform_hash}"`) are
/// stored verbatim in the metadata store's `*_embedding_id` columns but
/// mapped through a stable UUID v5 derivation for the actual point id. Same
/// label always derives the same point id, which is what gives
/// re-enrichment its last-writer-wins idempotence.
const POINT_ID_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x6d, 0x65, 0x64, 0x69, 0x61, 0x2d, 0x70, 0x6f, 0x69, 0x6e, 0x74, 0x2d, 0x6e, 0x73, 0x00, 0x01,
]);

pub fn deterministic_point_id(label: &str) -> uuid::Uuid {
    uuid::Uuid::new_v5(&POINT_ID_NAMESPACE, label.as_bytes())
}

#[cfg(test)]
mod point_id_tests {
    use super::deterministic_point_id;

    #[test]
    fn same_label_derives_the_same_point_id() {
        assert_eq!(deterministic_point_id("clip_abc"), deterministic_point_id("clip_abc"));
        assert_ne!(deterministic_point_id("clip_abc"), deterministic_point_id("clip_def"));
    }
}
