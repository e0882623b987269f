use qdrant_client::Payload;
use qdrant_client::qdrant::{
    Condition, DeletePointsBuilder, Filter, PointStruct, UpsertPointsBuilder,
};
use serde_json::json;
use uuid::Uuid;

use crate::{VectorIndex, VectorIndexError, VectorSpace};

/// One vector plus the payload fields filtered search and media cleanup
/// depend on. `extra_payload` carries modality-specific fields (e.g. the
/// text worker's `source_id`/`source_type`/content preview) that ride
/// alongside the common fields without widening this struct per caller.
#[derive(Debug, Clone)]
pub struct EmbeddingPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub project_id: Uuid,
    pub media_id: Uuid,
    pub media_type: String,
    pub extra_payload: Option<serde_json::Value>,
}

impl EmbeddingPoint {
    fn into_point_struct(self) -> Result<PointStruct, VectorIndexError> {
        if self.vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorIndexError::InvalidEmbedding(format!(
                "point {} contains a non-finite component",
                self.id
            )));
        }

        let mut fields = json!({
            "project_id": self.project_id.to_string(),
            "media_id": self.media_id.to_string(),
            "media_type": self.media_type,
        });
        if let Some(extra) = self.extra_payload {
            if let (Some(base), Some(extra)) = (fields.as_object_mut(), extra.as_object()) {
                for (key, value) in extra {
                    base.insert(key.clone(), value.clone());
                }
            }
        }

        let payload: Payload = fields.try_into().expect("payload is a JSON object");

        Ok(PointStruct::new(self.id.to_string(), self.vector, payload))
    }
}

impl VectorIndex {
    pub async fn upsert(&self, space: VectorSpace, point: EmbeddingPoint) -> Result<(), VectorIndexError> {
        self.upsert_batch(space, vec![point]).await
    }

    pub async fn upsert_batch(
        &self,
        space: VectorSpace,
        points: Vec<EmbeddingPoint>,
    ) -> Result<(), VectorIndexError> {
        if points.is_empty() {
            return Ok(());
        }

        let collection = self.collection_name(space).to_string();
        let points = points
            .into_iter()
            .map(EmbeddingPoint::into_point_struct)
            .collect::<Result<Vec<_>, _>>()?;

        self.client()
            .upsert_points(UpsertPointsBuilder::new(collection, points))
            .await?;
        Ok(())
    }

    /// Removes every point across all three collections that belongs to a
    /// given media item, used when media is deleted or re-enriched.
    pub async fn delete_by_media(&self, media_id: Uuid) -> Result<(), VectorIndexError> {
        let filter = Filter::must([Condition::matches("media_id", media_id.to_string())]);

        for space in [VectorSpace::Clip, VectorSpace::Dino, VectorSpace::Text] {
            let collection = self.collection_name(space).to_string();
            self.client()
                .delete_points(DeletePointsBuilder::new(collection).points(filter.clone()))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_vector_components() {
        let point = EmbeddingPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, f32::NAN, 0.3],
            project_id: Uuid::new_v4(),
            media_id: Uuid::new_v4(),
            media_type: "image".to_string(),
            extra_payload: None,
        };

        assert!(matches!(
            point.into_point_struct(),
            Err(VectorIndexError::InvalidEmbedding(_))
        ));
    }

    #[test]
    fn builds_point_struct_with_string_payload() {
        let point = EmbeddingPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2, 0.3],
            project_id: Uuid::new_v4(),
            media_id: Uuid::new_v4(),
            media_type: "image".to_string(),
            extra_payload: None,
        };

        assert!(point.into_point_struct().is_ok());
    }

    #[test]
    fn merges_extra_payload_fields() {
        let point = EmbeddingPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2, 0.3],
            project_id: Uuid::new_v4(),
            media_id: Uuid::new_v4(),
            media_type: "text_chunk".to_string(),
            extra_payload: Some(json!({ "source_id": "abc", "preview": "hello" })),
        };

        assert!(point.into_point_struct().is_ok());
    }
}
