//! Blob storage for uploaded media, generated thumbnails, and dataset
//! exports, behind a single [`Store`] trait so the rest of the platform
//! never has to know whether it's talking to the local filesystem or an
//! S3-compatible bucket.

pub mod error;
mod local;
mod s3;
mod signed_url;
mod thumbnail;

pub use error::StoreError;
pub use local::LocalStore;
pub use s3::S3Store;
pub use signed_url::{UrlSigner, verify_signed_url};
pub use thumbnail::generate_thumbnail;

use async_trait::async_trait;

/// Which logical bucket an object belongs to; backends map this to a
/// concrete bucket name or filesystem subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Media,
    Thumbnails,
    Exports,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: Bucket,
    pub key: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn put(&self, bucket: Bucket, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<StoredObject, StoreError>;

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Idempotent: deleting an object that doesn't exist is not an error.
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), StoreError>;

    /// A URL the caller can use to fetch the object directly, valid for
    /// `expires_in_secs` seconds.
    fn signed_url(&self, bucket: Bucket, key: &str, expires_in_secs: u64) -> Result<String, StoreError>;
}
