//! Thin wrapper around `qdrant-client` providing the three fixed collections
//! the hybrid search and enrichment pipeline read and write: CLIP image
//! embeddings, DINO image embeddings, and text embeddings (captions, source
//! text, and CLIP/SBERT text-query vectors share the text collection so a
//! text query can be compared against either branch without a second round
//! trip).

pub mod error;
mod points;
mod search;

pub use error::VectorIndexError;
pub use points::EmbeddingPoint;
pub use search::{Recommendation, ScoredMatch, SearchFilter};

use std::time::Duration;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
    VectorParamsBuilder, VectorsConfig, vectors_config::Config as VectorsConfigInner,
};
use tracing::{info, warn};
use utils::config::QdrantConfig;

pub const CLIP_VECTOR_DIM: u64 = 512;
pub const DINO_VECTOR_DIM: u64 = 768;
pub const TEXT_VECTOR_DIM: u64 = 384;

/// One of the three fixed vector collections this platform indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSpace {
    Clip,
    Dino,
    Text,
}

impl VectorSpace {
    fn dimension(&self) -> u64 {
        match self {
            VectorSpace::Clip => CLIP_VECTOR_DIM,
            VectorSpace::Dino => DINO_VECTOR_DIM,
            VectorSpace::Text => TEXT_VECTOR_DIM,
        }
    }
}

pub struct VectorIndex {
    client: Qdrant,
    collection_clip: String,
    collection_dino: String,
    collection_text: String,
}

const RETRY_BASE: Duration = Duration::from_millis(200);
const RETRY_FACTOR: u32 = 2;
const RETRY_MAX_ATTEMPTS: u32 = 5;
const PAYLOAD_INDEXED_FIELDS: [&str; 3] = ["project_id", "media_id", "media_type"];

impl VectorIndex {
    pub fn connect(config: &QdrantConfig) -> Result<Self, VectorIndexError> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            collection_clip: config.collection_clip.clone(),
            collection_dino: config.collection_dino.clone(),
            collection_text: config.collection_text.clone(),
        })
    }

    fn collection_name(&self, space: VectorSpace) -> &str {
        match space {
            VectorSpace::Clip => &self.collection_clip,
            VectorSpace::Dino => &self.collection_dino,
            VectorSpace::Text => &self.collection_text,
        }
    }

    pub(crate) fn client(&self) -> &Qdrant {
        &self.client
    }

    /// Creates any of the three collections that don't already exist, and
    /// makes sure the payload fields filtered search relies on are indexed.
    /// Qdrant occasionally drops a gRPC connection mid-rollout; each
    /// collection operation is retried with exponential backoff rather than
    /// failing startup outright.
    pub async fn ensure_collections(&self) -> Result<(), VectorIndexError> {
        for space in [VectorSpace::Clip, VectorSpace::Dino, VectorSpace::Text] {
            self.ensure_collection(space).await?;
        }
        Ok(())
    }

    async fn ensure_collection(&self, space: VectorSpace) -> Result<(), VectorIndexError> {
        let name = self.collection_name(space).to_string();

        let exists = with_retry("check", &name, || self.client.collection_exists(name.clone())).await?;

        if !exists {
            let vector_params = VectorParamsBuilder::new(space.dimension(), Distance::Cosine).build();
            let vectors_config = VectorsConfig {
                config: Some(VectorsConfigInner::Params(vector_params)),
            };
            let create = CreateCollectionBuilder::new(name.clone()).vectors_config(vectors_config);

            with_retry("create", &name, || self.client.create_collection(create.clone())).await?;
            info!(collection = %name, "created vector collection");
        }

        for field in PAYLOAD_INDEXED_FIELDS {
            let index = CreateFieldIndexCollectionBuilder::new(name.clone(), field, FieldType::Keyword);
            with_retry("index", &name, || self.client.create_field_index(index.clone())).await?;
        }

        Ok(())
    }
}

/// Retries a fallible Qdrant operation with exponential backoff: 200ms, 400ms,
/// 800ms, 1.6s, 3.2s across up to 5 attempts before giving up.
async fn with_retry<T, F, Fut>(action: &'static str, collection: &str, mut op: F) -> Result<T, VectorIndexError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, qdrant_client::QdrantError>>,
{
    let mut delay = RETRY_BASE;
    let mut last_err = None;

    for attempt in 1..=RETRY_MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(collection, action, attempt, error = %err, "qdrant operation failed, retrying");
                last_err = Some(err);
                if attempt < RETRY_MAX_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay *= RETRY_FACTOR;
                }
            }
        }
    }

    Err(VectorIndexError::CollectionRetryExhausted {
        action,
        collection: collection.to_string(),
        attempts: RETRY_MAX_ATTEMPTS,
        source: last_err.expect("loop runs at least once"),
    })
}
