use std::sync::Arc;

use db::repositories::media_repository::MediaRepository;
use db::repositories::media_source_repository::MediaSourceRepository;
use sqlx::SqlitePool;
use uuid::Uuid;
use vector_index::{EmbeddingPoint, VectorIndex, VectorSpace};

use crate::encoders::TextEncoder;
use crate::enrichment::{WorkerOutcome, deterministic_point_id};
use crate::error::ServiceError;

const MAX_CHUNK_CHARS: usize = 512;
const PREVIEW_CHARS: usize = 200;

pub struct TextEmbeddingWorker {
    pool: SqlitePool,
    index: Arc<VectorIndex>,
    encoder: Arc<dyn TextEncoder>,
}

impl TextEmbeddingWorker {
    pub fn new(pool: SqlitePool, index: Arc<VectorIndex>, encoder: Arc<dyn TextEncoder>) -> Self {
        Self { pool, index, encoder }
    }

    pub async fn process(&self, project_id: Uuid, media_id: Uuid) -> Result<WorkerOutcome, ServiceError> {
        let sources = MediaSourceRepository::list_for_media(&self.pool, media_id).await?;
        let text_sources: Vec<_> = sources
            .into_iter()
            .filter(|s| s.content.as_deref().map(|c| !c.trim().is_empty()).unwrap_or(false))
            .collect();

        if text_sources.is_empty() {
            return Ok(WorkerOutcome::Skipped { reason: "no attached MediaSource has text content" });
        }

        for source in &text_sources {
            let content = source.content.as_deref().unwrap_or_default();
            let chunks = chunk_text(content);

            let mut points = Vec::with_capacity(chunks.len());
            for (chunk_index, chunk) in chunks.iter().enumerate() {
                let vector = self.encoder.encode_text(chunk).await?;
                let label = format!("text_{media_id}_{}_{chunk_index}", source.id);
                points.push(EmbeddingPoint {
                    id: deterministic_point_id(&label),
                    vector,
                    project_id,
                    media_id,
                    media_type: "text_chunk".to_string(),
                    extra_payload: Some(serde_json::json!({
                        "source_id": source.id.to_string(),
                        "source_type": source.source_type,
                        "preview": preview(chunk),
                    })),
                });
            }
            self.index.upsert_batch(VectorSpace::Text, points).await?;

            let source_label = format!("text_{media_id}");
            MediaSourceRepository::record_text_embedding(&self.pool, source.id, &source_label).await?;
        }

        MediaRepository::record_text_embedding(&self.pool, media_id, &format!("text_{media_id}")).await?;
        Ok(WorkerOutcome::Completed)
    }
}

/// Splits at `". "` sentence boundaries first, falling through to a hard
/// cut at `MAX_CHUNK_CHARS` when a sentence alone exceeds the limit.
fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in text.split_inclusive(". ") {
        if current.len() + sentence.len() > MAX_CHUNK_CHARS && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if sentence.len() > MAX_CHUNK_CHARS {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            for hard_chunk in hard_cut(sentence) {
                chunks.push(hard_chunk);
            }
            continue;
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(text.to_string());
    }
    chunks
}

fn hard_cut(text: &str) -> Vec<String> {
    text.chars()
        .collect::<Vec<char>>()
        .chunks(MAX_CHUNK_CHARS)
        .map(|c| c.iter().collect())
        .collect()
}

fn preview(chunk: &str) -> String {
    chunk.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_splits_on_sentence_boundaries() {
        let text = "First sentence. Second sentence. Third sentence.";
        let chunks = chunk_text(text);
        assert!(chunks.iter().all(|c| c.len() <= MAX_CHUNK_CHARS));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn chunk_text_hard_cuts_an_oversized_sentence() {
        let text = "a".repeat(1000);
        let chunks = chunk_text(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_CHUNK_CHARS));
    }

    #[test]
    fn preview_truncates_to_200_chars() {
        let text = "x".repeat(500);
        assert_eq!(preview(&text).chars().count(), PREVIEW_CHARS);
    }
}
