use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgreementScore {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub dataset_id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub dataset_item_id: Uuid,
    pub annotator_ids: sqlx::types::Json<Vec<Uuid>>,
    pub metric: String,
    pub score: f64,
    pub per_label_details: sqlx::types::Json<serde_json::Value>,
    pub computed_at: DateTime<Utc>,
}
