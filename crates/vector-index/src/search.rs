use qdrant_client::qdrant::{Condition, Filter, PointId, QueryPointsBuilder, RecommendPointsBuilder};
use uuid::Uuid;

use crate::{VectorIndex, VectorIndexError, VectorSpace};

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub project_id: Option<Uuid>,
    pub media_type: Option<String>,
}

impl SearchFilter {
    fn into_qdrant(self) -> Filter {
        let mut conditions = Vec::new();
        if let Some(project_id) = self.project_id {
            conditions.push(Condition::matches("project_id", project_id.to_string()));
        }
        if let Some(media_type) = self.media_type {
            conditions.push(Condition::matches("media_type", media_type));
        }
        Filter::must(conditions)
    }
}

#[derive(Debug, Clone)]
pub struct ScoredMatch {
    pub point_id: String,
    pub media_id: String,
    pub project_id: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub reference_point_id: Uuid,
    pub filter: SearchFilter,
    pub limit: u64,
}

impl VectorIndex {
    /// Nearest-neighbor search for a raw query vector against one of the
    /// three collections, optionally restricted to a project or media type.
    pub async fn search(
        &self,
        space: VectorSpace,
        vector: Vec<f32>,
        filter: SearchFilter,
        limit: u64,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredMatch>, VectorIndexError> {
        let collection = self.collection_name(space).to_string();

        let mut builder = QueryPointsBuilder::new(collection)
            .query(vector)
            .limit(limit)
            .filter(filter.into_qdrant())
            .with_payload(true)
            .with_vectors(false);
        if let Some(threshold) = score_threshold {
            builder = builder.score_threshold(threshold);
        }

        let response = self.client().query(builder).await?;
        Ok(response.result.into_iter().map(scored_match_from_point).collect())
    }

    /// Recommends points near an existing point's vector, used by
    /// "find similar" actions where no fresh query embedding is available.
    pub async fn recommend(
        &self,
        space: VectorSpace,
        recommendation: Recommendation,
    ) -> Result<Vec<ScoredMatch>, VectorIndexError> {
        let collection = self.collection_name(space).to_string();
        let reference: PointId = recommendation.reference_point_id.to_string().into();

        let builder = RecommendPointsBuilder::new(collection, recommendation.limit)
            .add_positive(reference)
            .filter(recommendation.filter.into_qdrant())
            .with_payload(true)
            .with_vectors(false);

        let response = self.client().recommend(builder).await?;
        Ok(response.result.into_iter().map(scored_match_from_point).collect())
    }
}

fn scored_match_from_point(point: qdrant_client::qdrant::ScoredPoint) -> ScoredMatch {
    let point_id = match point.id.as_ref().and_then(|id| id.point_id_options.as_ref()) {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s)) => s.clone(),
        None => String::new(),
    };

    let payload = point.payload;
    let media_id = payload
        .get("media_id")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let project_id = payload
        .get("project_id")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    ScoredMatch {
        point_id,
        media_id,
        project_id,
        score: point.score,
    }
}
