use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

/// A reference attached to a Media row. Additive: duplicate attachments are
/// detectable via `content_hash` but never rejected.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MediaSource {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub media_id: Uuid,
    pub source_type: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub content_hash: Option<String>,
    pub text_embedding_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewMediaSource {
    pub media_id: Uuid,
    pub source_type: String,
    pub url: Option<String>,
    pub content: Option<String>,
}
