use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    annotation_review::{AnnotationReview, ReviewStatus, apply_review},
};

pub struct AnnotationReviewRepository;

impl AnnotationReviewRepository {
    pub async fn create(
        pool: &SqlitePool,
        annotation_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<AnnotationReview, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, AnnotationReview>(
            r#"
            INSERT INTO annotation_reviews (id, annotation_id, reviewer_id, status, created_at)
            VALUES (?, ?, ?, 'pending', datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(annotation_id.as_bytes().as_slice())
        .bind(reviewer_id.as_bytes().as_slice())
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<AnnotationReview>, RepoError> {
        sqlx::query_as::<Sqlite, AnnotationReview>("SELECT * FROM annotation_reviews WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn list_pending(pool: &SqlitePool, reviewer_id: Uuid) -> Result<Vec<AnnotationReview>, RepoError> {
        sqlx::query_as::<Sqlite, AnnotationReview>(
            "SELECT * FROM annotation_reviews WHERE reviewer_id = ? AND status = 'pending' ORDER BY created_at ASC",
        )
        .bind(reviewer_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn resolve(
        pool: &SqlitePool,
        id: Uuid,
        decision: ReviewStatus,
        comment: Option<String>,
    ) -> Result<AnnotationReview, RepoError> {
        let current = Self::find_by_id(pool, id)
            .await?
            .ok_or(RepoError::NotFound("annotation_review"))?;
        let next = apply_review(current.status, decision).map_err(RepoError::InvalidTransition)?;

        sqlx::query_as::<Sqlite, AnnotationReview>(
            "UPDATE annotation_reviews SET status = ?, comment = ? WHERE id = ? RETURNING *",
        )
        .bind(next.to_string())
        .bind(comment)
        .bind(id.as_bytes().as_slice())
        .fetch_one(pool)
        .await
        .map_err(RepoError::Database)
    }
}
