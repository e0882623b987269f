use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DatasetType {
    Classification,
    ObjectDetection,
    InstanceSegmentation,
    SemanticSegmentation,
    Captioning,
    NamedEntityRecognition,
    Transcription,
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DatasetType::Classification => "classification",
            DatasetType::ObjectDetection => "object_detection",
            DatasetType::InstanceSegmentation => "instance_segmentation",
            DatasetType::SemanticSegmentation => "semantic_segmentation",
            DatasetType::Captioning => "captioning",
            DatasetType::NamedEntityRecognition => "named_entity_recognition",
            DatasetType::Transcription => "transcription",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DatasetType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classification" => Ok(DatasetType::Classification),
            "object_detection" => Ok(DatasetType::ObjectDetection),
            "instance_segmentation" => Ok(DatasetType::InstanceSegmentation),
            "semantic_segmentation" => Ok(DatasetType::SemanticSegmentation),
            "captioning" => Ok(DatasetType::Captioning),
            "named_entity_recognition" => Ok(DatasetType::NamedEntityRecognition),
            "transcription" => Ok(DatasetType::Transcription),
            other => Err(format!("invalid dataset type: {other}")),
        }
    }
}

impl TryFrom<String> for DatasetType {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DatasetStatus {
    Draft,
    Active,
    Frozen,
    Archived,
}

impl std::fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DatasetStatus::Draft => "draft",
            DatasetStatus::Active => "active",
            DatasetStatus::Frozen => "frozen",
            DatasetStatus::Archived => "archived",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DatasetStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DatasetStatus::Draft),
            "active" => Ok(DatasetStatus::Active),
            "frozen" => Ok(DatasetStatus::Frozen),
            "archived" => Ok(DatasetStatus::Archived),
            other => Err(format!("invalid dataset status: {other}")),
        }
    }
}

impl TryFrom<String> for DatasetStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LabelDef {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LabelSchema {
    pub labels: Vec<LabelDef>,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dataset {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub project_id: Uuid,
    pub slug: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub dataset_type: DatasetType,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub status: DatasetStatus,
    pub label_schema: sqlx::types::Json<LabelSchema>,
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub test_ratio: f64,
    pub item_count: i64,
    pub annotated_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewDataset {
    pub project_id: Uuid,
    pub slug: String,
    pub name: String,
    pub dataset_type: DatasetType,
    pub label_schema: LabelSchema,
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub test_ratio: f64,
}
