use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Split {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "val" => Ok(Split::Val),
            "test" => Ok(Split::Test),
            other => Err(format!("invalid split: {other}")),
        }
    }
}

impl TryFrom<String> for Split {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DatasetItem {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub dataset_id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub media_id: Uuid,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub split: Split,
    pub priority: i32,
    pub is_annotated: bool,
    /// Nullable foreign keys are stored as hex text rather than BLOB so a
    /// NULL doesn't need a manual `TryFrom<Option<Vec<u8>>>` impl.
    #[ts(type = "string | null")]
    pub assignee_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
