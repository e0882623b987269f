use std::io::Cursor;
use std::sync::Arc;

use content_store::{Bucket, Store};
use db::models::annotation::{Annotation, AnnotationSource, AnnotationType, NewAnnotation};
use db::models::dataset_item::Split;
use db::models::media::{Media, MediaKind, NewMedia};
use db::repositories::annotation_repository::AnnotationRepository;
use db::repositories::dataset_item_repository::DatasetItemRepository;
use db::repositories::media_repository::MediaRepository;
use image::imageops::FilterType;
use image::{ImageEncoder, ImageReader};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::enrichment::WorkerOutcome;
use crate::error::ServiceError;
use crate::quality::{Geometry, GeometryTransform, transform_geometry};

pub struct AugmentationWorker {
    pool: SqlitePool,
    store: Arc<dyn Store>,
}

impl AugmentationWorker {
    pub fn new(pool: SqlitePool, store: Arc<dyn Store>) -> Self {
        Self { pool, store }
    }

    /// Derives a new `Media` row and a transformed copy of each annotation
    /// on `item_id`, hard-coding the derived item's split to `"train"` per
    /// the Open Questions resolution in `DESIGN.md`. Idempotent: rerunning
    /// with the same `transforms` for the same source item is a no-op,
    /// detected via a checksum derived from the same label spec.md names
    /// (`"aug_{base_media_id}_{transform_hash}"`) rather than from the
    /// transformed bytes, since `MediaRepository::create` doesn't accept a
    /// caller-supplied id.
    pub async fn process(
        &self,
        project_id: Uuid,
        dataset_id: Uuid,
        item_id: Uuid,
        transforms: &[GeometryTransform],
    ) -> Result<WorkerOutcome, ServiceError> {
        let item = DatasetItemRepository::find_by_id(&self.pool, item_id).await?.ok_or(ServiceError::NotFound("dataset item"))?;
        let media = MediaRepository::find_by_id(&self.pool, item.media_id).await?.ok_or(ServiceError::NotFound("media"))?;

        if media.kind != MediaKind::Image {
            return Ok(WorkerOutcome::Skipped { reason: "augmentation only applies to image media" });
        }

        let label = format!("aug_{}_{}", media.id, transform_hash(transforms));
        let idempotence_key = hex::encode(Sha256::digest(label.as_bytes()));
        if MediaRepository::find_by_checksum(&self.pool, project_id, &idempotence_key).await?.is_some() {
            return Ok(WorkerOutcome::Skipped { reason: "augmented media already exists for this transform set" });
        }

        let source_bytes = self.store.get(Bucket::Media, &media.storage_path).await?;
        let (transformed_bytes, width, height) = match apply_raster_transforms(&source_bytes, transforms) {
            Ok(result) => result,
            Err(err) => return Ok(WorkerOutcome::Failed { error: err }),
        };

        let storage_path = format!("augmented/{label}.jpg");
        self.store.put(Bucket::Media, &storage_path, "image/jpeg", transformed_bytes.clone()).await?;

        let derived_media = MediaRepository::create(
            &self.pool,
            NewMedia {
                project_id,
                filename: format!("{label}.jpg"),
                kind: MediaKind::Image,
                mime_type: "image/jpeg".to_string(),
                size_bytes: transformed_bytes.len() as i64,
                checksum_sha256: idempotence_key,
                storage_path,
                width: Some(width as i32),
                height: Some(height as i32),
                duration_sec: None,
                fps: None,
            },
        )
        .await?;

        let derived_item = DatasetItemRepository::add_media(&self.pool, dataset_id, derived_media.id, Split::Train).await?;

        let source_annotations = AnnotationRepository::list_for_item(&self.pool, item_id).await?;
        for ann in &source_annotations {
            self.augment_annotation(ann, derived_item.id, transforms, &media).await?;
        }

        if !source_annotations.is_empty() {
            DatasetItemRepository::set_annotated(&self.pool, derived_item.id, true).await?;
        }

        Ok(WorkerOutcome::Completed)
    }

    async fn augment_annotation(
        &self,
        ann: &Annotation,
        derived_item_id: Uuid,
        transforms: &[GeometryTransform],
        source_media: &Media,
    ) -> Result<(), ServiceError> {
        let width = source_media.width.unwrap_or(0) as f64;
        let height = source_media.height.unwrap_or(0) as f64;

        let geometry = match geometry_from_annotation(ann) {
            Some(geom) => {
                let transformed = transform_geometry(geom, transforms, width, height);
                geometry_to_json(transformed)
            }
            None => ann.geometry.0.clone(),
        };

        AnnotationRepository::create(
            &self.pool,
            NewAnnotation {
                dataset_item_id: derived_item_id,
                user_id: ann.user_id,
                annotation_type: ann.annotation_type,
                label: ann.label.clone(),
                confidence: ann.confidence,
                geometry,
                attributes: ann.attributes.0.clone(),
                frame_or_time: ann.frame_or_time,
                source: AnnotationSource::Augmented,
            },
        )
        .await?;
        Ok(())
    }
}

fn geometry_from_annotation(ann: &Annotation) -> Option<Geometry> {
    let geom = &ann.geometry.0;
    match ann.annotation_type {
        AnnotationType::Bbox => Some(Geometry::Bbox {
            x: geom.get("x")?.as_f64()?,
            y: geom.get("y")?.as_f64()?,
            w: geom.get("w")?.as_f64()?,
            h: geom.get("h")?.as_f64()?,
        }),
        AnnotationType::Point => Some(Geometry::Point { x: geom.get("x")?.as_f64()?, y: geom.get("y")?.as_f64()? }),
        AnnotationType::Polygon => {
            let points = geom
                .get("points")?
                .as_array()?
                .iter()
                .filter_map(|p| {
                    let p = p.as_array()?;
                    Some((p.first()?.as_f64()?, p.get(1)?.as_f64()?))
                })
                .collect();
            Some(Geometry::Polygon { points })
        }
        _ => None,
    }
}

fn geometry_to_json(geometry: Geometry) -> serde_json::Value {
    match geometry {
        Geometry::Bbox { x, y, w, h } => serde_json::json!({ "x": x, "y": y, "w": w, "h": h }),
        Geometry::Point { x, y } => serde_json::json!({ "x": x, "y": y }),
        Geometry::Polygon { points } => {
            serde_json::json!({ "points": points.into_iter().map(|(x, y)| vec![x, y]).collect::<Vec<_>>() })
        }
    }
}

fn transform_hash(transforms: &[GeometryTransform]) -> String {
    let description = transforms
        .iter()
        .map(|t| match t {
            GeometryTransform::HorizontalFlip => "hflip".to_string(),
            GeometryTransform::VerticalFlip => "vflip".to_string(),
            GeometryTransform::Scale { factor } => format!("scale{factor:.4}"),
        })
        .collect::<Vec<_>>()
        .join("_");
    hex::encode(Sha256::digest(description.as_bytes()))[..12].to_string()
}

fn apply_raster_transforms(source_bytes: &[u8], transforms: &[GeometryTransform]) -> Result<(Vec<u8>, u32, u32), String> {
    let mut image = ImageReader::new(Cursor::new(source_bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .decode()
        .map_err(|e| e.to_string())?;

    for t in transforms {
        image = match t {
            GeometryTransform::HorizontalFlip => image.fliph(),
            GeometryTransform::VerticalFlip => image.flipv(),
            GeometryTransform::Scale { factor } => {
                let new_w = ((image.width() as f64) * factor).round().max(1.0) as u32;
                let new_h = ((image.height() as f64) * factor).round().max(1.0) as u32;
                image.resize_exact(new_w, new_h, FilterType::Lanczos3)
            }
        };
    }

    let (width, height) = (image.width(), image.height());
    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 90);
    encoder
        .write_image(image.as_bytes(), width, height, image.color().into())
        .map_err(|e| e.to_string())?;

    Ok((out, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_hash_is_stable_for_the_same_transforms() {
        let transforms = vec![GeometryTransform::HorizontalFlip, GeometryTransform::Scale { factor: 1.5 }];
        assert_eq!(transform_hash(&transforms), transform_hash(&transforms));
    }

    #[test]
    fn transform_hash_differs_for_different_transforms() {
        let a = vec![GeometryTransform::HorizontalFlip];
        let b = vec![GeometryTransform::VerticalFlip];
        assert_ne!(transform_hash(&a), transform_hash(&b));
    }

    #[test]
    fn geometry_roundtrips_through_json_for_bbox() {
        let json = serde_json::json!({ "x": 1.0, "y": 2.0, "w": 3.0, "h": 4.0 });
        let geom = match geometry_to_json(Geometry::Bbox { x: 1.0, y: 2.0, w: 3.0, h: 4.0 }) {
            value => value,
        };
        assert_eq!(geom, json);
    }
}
