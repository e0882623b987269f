use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

/// Task kinds the indexing dispatcher may enqueue, one per enrichment worker
/// plus the augmentation task. Routing to a queue name is the only GPU
/// contention control, per `spec.md` §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TaskKind {
    ClipImage,
    DinoImage,
    VlmCaption,
    TextEmbedding,
    Augmentation,
}

impl TaskKind {
    pub fn queue_name(&self) -> &'static str {
        match self {
            TaskKind::ClipImage | TaskKind::DinoImage | TaskKind::VlmCaption => "gpu",
            TaskKind::TextEmbedding => "default",
            TaskKind::Augmentation => "default",
        }
    }

    pub fn max_attempts(&self) -> u32 {
        match self {
            TaskKind::ClipImage | TaskKind::DinoImage | TaskKind::TextEmbedding => 3,
            TaskKind::VlmCaption | TaskKind::Augmentation => 2,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskKind::ClipImage => "clip_image",
            TaskKind::DinoImage => "dino_image",
            TaskKind::VlmCaption => "vlm_caption",
            TaskKind::TextEmbedding => "text_embedding",
            TaskKind::Augmentation => "augmentation",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clip_image" => Ok(TaskKind::ClipImage),
            "dino_image" => Ok(TaskKind::DinoImage),
            "vlm_caption" => Ok(TaskKind::VlmCaption),
            "text_embedding" => Ok(TaskKind::TextEmbedding),
            "augmentation" => Ok(TaskKind::Augmentation),
            other => Err(format!("invalid task kind: {other}")),
        }
    }
}

impl TryFrom<String> for TaskKind {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TaskStatus {
    Pending,
    Claimed,
    Done,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Claimed => "claimed",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "claimed" => Ok(TaskStatus::Claimed),
            "done" => Ok(TaskStatus::Done),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QueuedTask {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub project_id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub media_id: Uuid,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub kind: TaskKind,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub status: TaskStatus,
    pub queue_name: String,
    pub priority: i32,
    pub attempts: i32,
    pub custom_prompt_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}
