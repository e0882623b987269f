use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TrainingJobStatus {
    Queued,
    Preparing,
    Training,
    Evaluating,
    Completed,
    Failed,
    Cancelled,
}

impl TrainingJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrainingJobStatus::Completed | TrainingJobStatus::Failed | TrainingJobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TrainingJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrainingJobStatus::Queued => "queued",
            TrainingJobStatus::Preparing => "preparing",
            TrainingJobStatus::Training => "training",
            TrainingJobStatus::Evaluating => "evaluating",
            TrainingJobStatus::Completed => "completed",
            TrainingJobStatus::Failed => "failed",
            TrainingJobStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TrainingJobStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TrainingJobStatus::Queued),
            "preparing" => Ok(TrainingJobStatus::Preparing),
            "training" => Ok(TrainingJobStatus::Training),
            "evaluating" => Ok(TrainingJobStatus::Evaluating),
            "completed" => Ok(TrainingJobStatus::Completed),
            "failed" => Ok(TrainingJobStatus::Failed),
            "cancelled" => Ok(TrainingJobStatus::Cancelled),
            other => Err(format!("invalid training job status: {other}")),
        }
    }
}

impl TryFrom<String> for TrainingJobStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ModelType {
    ImageClassifier,
    ObjectDetector,
    ClipFinetune,
    TextClassifier,
    Custom,
}

impl ModelType {
    /// Default base model per `spec.md` §4.I; callers may override for `Custom`.
    pub fn default_base_model(&self) -> &'static str {
        match self {
            ModelType::ImageClassifier => "resnet50",
            ModelType::ObjectDetector => "yolov8n",
            ModelType::ClipFinetune => "ViT-B/32",
            ModelType::TextClassifier => "distilbert-base-uncased",
            ModelType::Custom => "",
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModelType::ImageClassifier => "image_classifier",
            ModelType::ObjectDetector => "object_detector",
            ModelType::ClipFinetune => "clip_finetune",
            ModelType::TextClassifier => "text_classifier",
            ModelType::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ModelType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image_classifier" => Ok(ModelType::ImageClassifier),
            "object_detector" => Ok(ModelType::ObjectDetector),
            "clip_finetune" => Ok(ModelType::ClipFinetune),
            "text_classifier" => Ok(ModelType::TextClassifier),
            "custom" => Ok(ModelType::Custom),
            other => Err(format!("invalid model type: {other}")),
        }
    }
}

impl TryFrom<String> for ModelType {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrainingJob {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub project_id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub dataset_version_id: Uuid,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub model_type: ModelType,
    pub base_model: String,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub status: TrainingJobStatus,
    pub hyperparameters: sqlx::types::Json<serde_json::Value>,
    pub current_epoch: i32,
    pub total_epochs: i32,
    pub train_loss: Option<f64>,
    pub val_loss: Option<f64>,
    pub model_path: Option<String>,
    pub metrics: Option<sqlx::types::Json<serde_json::Value>>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The full transition table from `spec.md` §4.I. `Cancelled`/`Completed`/
/// `Failed` are terminal; any non-terminal state may be force-transitioned
/// to `Failed` (exception path) or `Cancelled` (user request).
pub fn next_status(current: TrainingJobStatus, requested: TrainingJobStatus) -> Result<TrainingJobStatus, String> {
    use TrainingJobStatus::*;

    if current.is_terminal() {
        return Err(format!("job already terminal at {current}"));
    }
    if requested == Failed || requested == Cancelled {
        return Ok(requested);
    }
    let allowed = matches!(
        (current, requested),
        (Queued, Preparing) | (Preparing, Training) | (Training, Training) | (Training, Evaluating) | (Evaluating, Completed)
    );
    if allowed {
        Ok(requested)
    } else {
        Err(format!("illegal transition {current} -> {requested}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TrainingJobStatus::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        assert_eq!(next_status(Queued, Preparing).unwrap(), Preparing);
        assert_eq!(next_status(Preparing, Training).unwrap(), Training);
        assert_eq!(next_status(Training, Training).unwrap(), Training);
        assert_eq!(next_status(Training, Evaluating).unwrap(), Evaluating);
        assert_eq!(next_status(Evaluating, Completed).unwrap(), Completed);
    }

    #[test]
    fn cancel_allowed_from_any_nonterminal_state() {
        assert_eq!(next_status(Preparing, Cancelled).unwrap(), Cancelled);
        assert_eq!(next_status(Training, Cancelled).unwrap(), Cancelled);
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        assert!(next_status(Completed, Training).is_err());
        assert!(next_status(Cancelled, Failed).is_err());
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(next_status(Queued, Training).is_err());
    }
}
