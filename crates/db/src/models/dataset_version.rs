use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ManifestItem {
    pub item_id: Uuid,
    pub media_id: Uuid,
    pub split: String,
}

/// Write-once. The manifest and stats are frozen at creation time; no
/// repository method updates them after the row exists.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DatasetVersion {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub dataset_id: Uuid,
    /// Must match `^[A-Za-z0-9._-]+$` and be unique within its dataset.
    pub tag: String,
    pub manifest: sqlx::types::Json<Vec<ManifestItem>>,
    pub stats: sqlx::types::Json<serde_json::Value>,
    pub export_path: Option<String>,
    pub export_format: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn is_valid_version_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_tags_accepted() {
        assert!(is_valid_version_tag("v1.0.0"));
        assert!(is_valid_version_tag("release_2024-01"));
    }

    #[test]
    fn invalid_tags_rejected() {
        assert!(!is_valid_version_tag(""));
        assert!(!is_valid_version_tag("v1 0"));
        assert!(!is_valid_version_tag("v1/0"));
    }
}
