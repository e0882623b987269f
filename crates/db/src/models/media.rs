use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Text,
    Document,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Text => "text",
            MediaKind::Document => "document",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "text" => Ok(MediaKind::Text),
            "document" => Ok(MediaKind::Document),
            _ => Err(format!("invalid media kind: {s}")),
        }
    }
}

impl TryFrom<String> for MediaKind {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Monotonic except for the sweeper, which re-enters `FAILED → PROCESSING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EnrichmentState {
    Pending,
    Processing,
    Completed,
    Failed,
    Partial,
}

impl std::fmt::Display for EnrichmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EnrichmentState::Pending => "pending",
            EnrichmentState::Processing => "processing",
            EnrichmentState::Completed => "completed",
            EnrichmentState::Failed => "failed",
            EnrichmentState::Partial => "partial",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EnrichmentState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(EnrichmentState::Pending),
            "processing" => Ok(EnrichmentState::Processing),
            "completed" => Ok(EnrichmentState::Completed),
            "failed" => Ok(EnrichmentState::Failed),
            "partial" => Ok(EnrichmentState::Partial),
            _ => Err(format!("invalid enrichment state: {s}")),
        }
    }
}

impl TryFrom<String> for EnrichmentState {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Media {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub project_id: Uuid,
    pub filename: String,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub kind: MediaKind,
    pub mime_type: String,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub storage_path: String,
    pub thumbnail_path: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_sec: Option<f64>,
    pub fps: Option<f64>,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub indexing_status: EnrichmentState,
    pub clip_embedding_id: Option<String>,
    pub dino_embedding_id: Option<String>,
    pub text_embedding_id: Option<String>,
    pub auto_caption: Option<String>,
    /// Order-preserving: carries VLM saliency, not a set.
    pub auto_tags: sqlx::types::Json<Vec<String>>,
    pub custom_indexing_results: Option<sqlx::types::Json<serde_json::Value>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: sqlx::types::Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewMedia {
    pub project_id: Uuid,
    pub filename: String,
    pub kind: MediaKind,
    pub mime_type: String,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub storage_path: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_sec: Option<f64>,
    pub fps: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_roundtrips() {
        for kind in [MediaKind::Image, MediaKind::Video, MediaKind::Audio, MediaKind::Text, MediaKind::Document] {
            assert_eq!(kind.to_string().parse::<MediaKind>().unwrap(), kind);
        }
    }
}
