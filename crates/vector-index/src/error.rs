use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("qdrant client error: {0}")]
    Client(#[from] qdrant_client::QdrantError),

    #[error("failed to {action} collection {collection} after {attempts} attempts: {source}")]
    CollectionRetryExhausted {
        action: &'static str,
        collection: String,
        attempts: u32,
        #[source]
        source: qdrant_client::QdrantError,
    },

    #[error("point {0} not found")]
    PointNotFound(String),

    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),
}
