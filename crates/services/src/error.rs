use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repo(#[from] db::models::RepoError),
    #[error(transparent)]
    VectorIndex(#[from] vector_index::VectorIndexError),
    #[error(transparent)]
    Store(#[from] content_store::StoreError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("encoder error: {0}")]
    Encoder(String),
    #[error("upstream fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("{0} not found")]
    NotFound(&'static str),
}
