use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Project {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    /// Opaque settings map, stored as JSON text.
    pub settings: sqlx::types::Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewProject {
    pub slug: String,
    pub name: String,
    pub settings: serde_json::Value,
}
