use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    NeedsRevision,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::NeedsRevision => "needs_revision",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            "needs_revision" => Ok(ReviewStatus::NeedsRevision),
            other => Err(format!("invalid review status: {other}")),
        }
    }
}

impl TryFrom<String> for ReviewStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnnotationReview {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub annotation_id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub reviewer_id: Uuid,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub status: ReviewStatus,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Only a `Pending` review may transition; everything else is terminal.
pub fn apply_review(
    current: ReviewStatus,
    decision: ReviewStatus,
) -> Result<ReviewStatus, String> {
    if current != ReviewStatus::Pending {
        return Err(format!("review already resolved as {current}"));
    }
    if decision == ReviewStatus::Pending {
        return Err("cannot apply a pending decision".to_string());
    }
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_review_can_be_approved() {
        assert_eq!(
            apply_review(ReviewStatus::Pending, ReviewStatus::Approved).unwrap(),
            ReviewStatus::Approved
        );
    }

    #[test]
    fn resolved_review_rejects_further_transitions() {
        assert!(apply_review(ReviewStatus::Approved, ReviewStatus::Rejected).is_err());
    }
}
