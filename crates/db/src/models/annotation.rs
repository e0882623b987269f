use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AnnotationType {
    Bbox,
    Polygon,
    Polyline,
    Point,
    Mask,
    Classification,
    Caption,
    Transcription,
    TemporalSegment,
    Custom,
}

impl std::fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnnotationType::Bbox => "bbox",
            AnnotationType::Polygon => "polygon",
            AnnotationType::Polyline => "polyline",
            AnnotationType::Point => "point",
            AnnotationType::Mask => "mask",
            AnnotationType::Classification => "classification",
            AnnotationType::Caption => "caption",
            AnnotationType::Transcription => "transcription",
            AnnotationType::TemporalSegment => "temporal_segment",
            AnnotationType::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AnnotationType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bbox" => Ok(AnnotationType::Bbox),
            "polygon" => Ok(AnnotationType::Polygon),
            "polyline" => Ok(AnnotationType::Polyline),
            "point" => Ok(AnnotationType::Point),
            "mask" => Ok(AnnotationType::Mask),
            "classification" => Ok(AnnotationType::Classification),
            "caption" => Ok(AnnotationType::Caption),
            "transcription" => Ok(AnnotationType::Transcription),
            "temporal_segment" => Ok(AnnotationType::TemporalSegment),
            "custom" => Ok(AnnotationType::Custom),
            other => Err(format!("invalid annotation type: {other}")),
        }
    }
}

impl TryFrom<String> for AnnotationType {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AnnotationSource {
    Manual,
    AutoVlm,
    AutoClip,
    Imported,
    Augmented,
}

impl std::fmt::Display for AnnotationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnnotationSource::Manual => "manual",
            AnnotationSource::AutoVlm => "auto_vlm",
            AnnotationSource::AutoClip => "auto_clip",
            AnnotationSource::Imported => "imported",
            AnnotationSource::Augmented => "augmented",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AnnotationSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(AnnotationSource::Manual),
            "auto_vlm" => Ok(AnnotationSource::AutoVlm),
            "auto_clip" => Ok(AnnotationSource::AutoClip),
            "imported" => Ok(AnnotationSource::Imported),
            "augmented" => Ok(AnnotationSource::Augmented),
            other => Err(format!("invalid annotation source: {other}")),
        }
    }
}

impl TryFrom<String> for AnnotationSource {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Annotation {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub dataset_item_id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub annotation_type: AnnotationType,
    pub label: String,
    pub confidence: f64,
    /// Shape depends on `annotation_type`: bbox `{x,y,w,h}`, polygon
    /// `{points:[[x,y],...]}`, point `{x,y}`, mask `{rle,size:[h,w]}`,
    /// temporal `{start_sec,end_sec}`, caption `{text}`.
    pub geometry: sqlx::types::Json<serde_json::Value>,
    pub attributes: sqlx::types::Json<serde_json::Value>,
    pub frame_or_time: Option<f64>,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub source: AnnotationSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewAnnotation {
    pub dataset_item_id: Uuid,
    pub user_id: Uuid,
    pub annotation_type: AnnotationType,
    pub label: String,
    pub confidence: f64,
    pub geometry: serde_json::Value,
    pub attributes: serde_json::Value,
    pub frame_or_time: Option<f64>,
    pub source: AnnotationSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_geometry_has_non_negative_extent() {
        let geom = serde_json::json!({"x": 10.0, "y": 20.0, "w": 100.0, "h": 200.0});
        let w = geom["w"].as_f64().unwrap();
        let h = geom["h"].as_f64().unwrap();
        assert!(w >= 0.0 && h >= 0.0);
    }
}
