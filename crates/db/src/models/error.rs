use thiserror::Error;

/// Shared error type across metadata-store repositories. Most entities share
/// the same failure shapes (missing row, sqlx error, constraint conflict);
/// the few with a real state machine layer `InvalidTransition` on top.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
}
