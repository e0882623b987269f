//! Hybrid search engine: fuses CLIP-text, TEXT-text, and image-reference
//! branches into one ranked result list, per `spec.md` §4.F.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use db::models::media::Media;
use db::repositories::media_repository::MediaRepository;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;
use vector_index::{SearchFilter as IndexFilter, VectorIndex, VectorSpace};

use crate::encoders::{ClipImageEncoder, ClipTextEncoder, TextEncoder};
use crate::enrichment::deterministic_point_id;
use crate::error::ServiceError;

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub project_id: Uuid,
    pub query: Option<String>,
    pub image_ref: Option<String>,
    pub media_types: Option<Vec<String>>,
    pub min_confidence: Option<f32>,
    pub use_clip: bool,
    pub use_text: bool,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit {
    pub media_id: Uuid,
    pub point_id: String,
    pub score: f32,
    pub source: &'static str,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<(Media, RankedHit)>,
    pub total: usize,
    pub took_ms: u64,
}

pub struct SearchEngine {
    pool: SqlitePool,
    index: Arc<VectorIndex>,
    clip_text: Arc<dyn ClipTextEncoder>,
    clip_image: Arc<dyn ClipImageEncoder>,
    text_encoder: Arc<dyn TextEncoder>,
    http: reqwest::Client,
}

impl SearchEngine {
    pub fn new(
        pool: SqlitePool,
        index: Arc<VectorIndex>,
        clip_text: Arc<dyn ClipTextEncoder>,
        clip_image: Arc<dyn ClipImageEncoder>,
        text_encoder: Arc<dyn TextEncoder>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client configuration is valid");
        Self { pool, index, clip_text, clip_image, text_encoder, http }
    }

    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse, ServiceError> {
        if req.query.as_deref().unwrap_or("").is_empty() && req.image_ref.as_deref().unwrap_or("").is_empty() {
            return Err(ServiceError::InvalidRequest("either query or image_ref must be provided".to_string()));
        }
        let started = Instant::now();

        let filter = IndexFilter { project_id: Some(req.project_id), media_type: req.media_types.as_ref().and_then(|t| t.first().cloned()) };

        let mut merged: HashMap<String, RankedHit> = HashMap::new();

        if let Some(query) = req.query.as_deref().filter(|q| !q.is_empty()) {
            if req.use_clip {
                let vector = self.clip_text.encode_text(query).await?;
                let hits = self.index.search(VectorSpace::Clip, vector, filter.clone(), req.limit * 2, req.min_confidence).await?;
                for hit in hits {
                    merge_max(&mut merged, hit.point_id, hit.media_id, hit.score, "clip");
                }
            }
            if req.use_text {
                let vector = self.text_encoder.encode_text(query).await?;
                let hits = self.index.search(VectorSpace::Text, vector, filter.clone(), req.limit * 2, req.min_confidence).await?;
                for hit in hits {
                    match merged.get_mut(&hit.media_id) {
                        None => {
                            merged.insert(
                                hit.media_id.clone(),
                                RankedHit { media_id: parse_media_id(&hit.media_id)?, point_id: hit.point_id, score: hit.score, source: "text" },
                            );
                        }
                        Some(existing) => {
                            existing.score = existing.score.max(hit.score) * 1.1;
                            existing.source = "hybrid";
                        }
                    }
                }
            }
        }

        if let Some(image_ref) = req.image_ref.as_deref().filter(|r| !r.is_empty()) {
            self.run_image_branch(image_ref, req.project_id, &filter, req.limit, &mut merged).await?;
        }

        let mut ranked: Vec<RankedHit> = merged.into_values().collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then_with(|| a.point_id.cmp(&b.point_id)));

        let total = ranked.len();
        let start = (req.offset as usize).min(ranked.len());
        let end = (start + req.limit as usize).min(ranked.len());
        let page = &ranked[start..end];

        let mut results = Vec::with_capacity(page.len());
        for hit in page {
            if let Some(media) = MediaRepository::find_by_id(&self.pool, hit.media_id).await? {
                results.push((media, hit.clone()));
            }
        }

        Ok(SearchResponse { results, total, took_ms: started.elapsed().as_millis() as u64 })
    }

    async fn run_image_branch(
        &self,
        image_ref: &str,
        project_id: Uuid,
        filter: &IndexFilter,
        limit: u64,
        merged: &mut HashMap<String, RankedHit>,
    ) -> Result<(), ServiceError> {
        if let Ok(media_id) = Uuid::parse_str(image_ref) {
            if let Some(media) = MediaRepository::find_by_id(&self.pool, media_id).await? {
                if let Some(point_id) = media.clip_embedding_id {
                    let recommendation = vector_index::Recommendation {
                        reference_point_id: deterministic_point_id(&point_id),
                        filter: filter.clone(),
                        limit,
                    };
                    let hits = self.index.recommend(VectorSpace::Clip, recommendation).await?;
                    for hit in hits {
                        if hit.media_id == media_id.to_string() {
                            continue;
                        }
                        merge_max(merged, hit.point_id, hit.media_id, hit.score, "clip");
                    }
                    return Ok(());
                }
            }
        }

        let bytes = self.http.get(image_ref).send().await?.error_for_status()?.bytes().await?;
        let vector = self.clip_image.encode_image(&bytes).await?;
        let hits = self.index.search(VectorSpace::Clip, vector, filter.clone(), limit, None).await?;
        for hit in hits {
            merge_max(merged, hit.point_id, hit.media_id, hit.score, "clip");
        }
        let _ = project_id;
        Ok(())
    }
}

fn merge_max(merged: &mut HashMap<String, RankedHit>, point_id: String, media_id_str: String, score: f32, source: &'static str) {
    let Ok(media_id) = Uuid::parse_str(&media_id_str) else { return };
    merged
        .entry(media_id_str)
        .and_modify(|existing| {
            if score > existing.score {
                existing.score = score;
                existing.point_id = point_id.clone();
            }
        })
        .or_insert(RankedHit { media_id, point_id, score, source });
}

fn parse_media_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::InvalidRequest(format!("vector index returned a non-UUID media_id: {raw}")))
}

/// `similar(media_id, method, limit)`: recommend against one or both
/// collections; `combined` averages the per-media score across both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarMethod {
    Clip,
    Dino,
    Combined,
}

impl SearchEngine {
    pub async fn similar(&self, media_id: Uuid, method: SimilarMethod, limit: u64) -> Result<Vec<RankedHit>, ServiceError> {
        let media = MediaRepository::find_by_id(&self.pool, media_id).await?.ok_or(ServiceError::NotFound("media"))?;

        let clip_hits = if method == SimilarMethod::Clip || method == SimilarMethod::Combined {
            self.recommend_for(&media.clip_embedding_id, VectorSpace::Clip, limit).await?
        } else {
            Vec::new()
        };
        let dino_hits = if method == SimilarMethod::Dino || method == SimilarMethod::Combined {
            self.recommend_for(&media.dino_embedding_id, VectorSpace::Dino, limit).await?
        } else {
            Vec::new()
        };

        let mut combined: HashMap<String, RankedHit> = HashMap::new();
        match method {
            SimilarMethod::Clip => {
                for hit in clip_hits {
                    merge_max(&mut combined, hit.point_id, hit.media_id, hit.score, "clip");
                }
            }
            SimilarMethod::Dino => {
                for hit in dino_hits {
                    merge_max(&mut combined, hit.point_id, hit.media_id, hit.score, "dino");
                }
            }
            SimilarMethod::Combined => {
                let mut sums: HashMap<String, (f32, u32, String)> = HashMap::new();
                for hit in clip_hits.into_iter().chain(dino_hits) {
                    let entry = sums.entry(hit.media_id.clone()).or_insert((0.0, 0, hit.point_id.clone()));
                    entry.0 += hit.score;
                    entry.1 += 1;
                }
                for (media_id_str, (sum, count, point_id)) in sums {
                    merge_max(&mut combined, point_id, media_id_str, sum / count.max(1) as f32, "combined");
                }
            }
        }

        let mut ranked: Vec<RankedHit> = combined.into_values().collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then_with(|| a.point_id.cmp(&b.point_id)));
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn recommend_for(&self, point_id: &Option<String>, space: VectorSpace, limit: u64) -> Result<Vec<vector_index::ScoredMatch>, ServiceError> {
        let Some(point_id) = point_id else { return Ok(Vec::new()) };
        let reference = deterministic_point_id(point_id);
        let recommendation = vector_index::Recommendation { reference_point_id: reference, filter: IndexFilter::default(), limit };
        Ok(self.index.recommend(space, recommendation).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_max_keeps_higher_score() {
        let mut merged = HashMap::new();
        let media_id = Uuid::new_v4();
        merge_max(&mut merged, "p1".into(), media_id.to_string(), 0.5, "clip");
        merge_max(&mut merged, "p2".into(), media_id.to_string(), 0.8, "clip");
        let hit = merged.get(&media_id.to_string()).unwrap();
        assert_eq!(hit.score, 0.8);
        assert_eq!(hit.point_id, "p2");
    }

    #[test]
    fn merge_max_ignores_non_uuid_media_id() {
        let mut merged = HashMap::new();
        merge_max(&mut merged, "p1".into(), "not-a-uuid".into(), 0.5, "clip");
        assert!(merged.is_empty());
    }
}
