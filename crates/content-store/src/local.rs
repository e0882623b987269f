use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::{Bucket, Store, StoreError, StoredObject, UrlSigner};

pub struct LocalStore {
    root: PathBuf,
    signer: UrlSigner,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, signed_url_secret: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            signer: UrlSigner::new(signed_url_secret),
            public_base_url: public_base_url.into(),
        }
    }

    fn bucket_dir(&self, bucket: Bucket) -> &'static str {
        match bucket {
            Bucket::Media => "media",
            Bucket::Thumbnails => "thumbnails",
            Bucket::Exports => "exports",
        }
    }

    fn object_path(&self, bucket: Bucket, key: &str) -> PathBuf {
        self.root.join(self.bucket_dir(bucket)).join(key)
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn put(&self, bucket: Bucket, key: &str, _content_type: &str, bytes: Vec<u8>) -> Result<StoredObject, StoreError> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let size_bytes = bytes.len() as u64;
        fs::write(&path, bytes).await?;

        Ok(StoredObject {
            bucket,
            key: key.to_string(),
            size_bytes,
        })
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn signed_url(&self, bucket: Bucket, key: &str, expires_in_secs: u64) -> Result<String, StoreError> {
        let bucket_name = self.bucket_dir(bucket);
        let expires_at = now_unix() + expires_in_secs;
        let signature = self.signer.sign(bucket_name, key, expires_at);

        Ok(format!(
            "{}/blobs/{bucket_name}/{key}?expires={expires_at}&sig={signature}",
            self.public_base_url.trim_end_matches('/'),
        ))
    }
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let dir = std::env::temp_dir().join(format!("content-store-test-{}", uuid::Uuid::new_v4()));
        let store = LocalStore::new(&dir, "secret", "http://localhost:8080");

        store.put(Bucket::Media, "a/b.jpg", "image/jpeg", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get(Bucket::Media, "a/b.jpg").await.unwrap(), vec![1, 2, 3]);

        store.delete(Bucket::Media, "a/b.jpg").await.unwrap();
        assert!(matches!(store.get(Bucket::Media, "a/b.jpg").await, Err(StoreError::NotFound(_))));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn deleting_missing_object_is_not_an_error() {
        let dir = std::env::temp_dir().join(format!("content-store-test-{}", uuid::Uuid::new_v4()));
        let store = LocalStore::new(&dir, "secret", "http://localhost:8080");
        assert!(store.delete(Bucket::Media, "missing.jpg").await.is_ok());
    }

    #[test]
    fn signed_url_contains_signature_and_expiry() {
        let store = LocalStore::new("/tmp/content-store", "secret", "http://localhost:8080");
        let url = store.signed_url(Bucket::Media, "a/b.jpg", 3600).unwrap();
        assert!(url.contains("sig="));
        assert!(url.contains("expires="));
    }
}
