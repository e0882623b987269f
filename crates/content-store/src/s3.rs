use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::{Bucket, Store, StoreError, StoredObject};

/// S3-compatible backend; works against AWS S3 or MinIO/DigitalOcean Spaces
/// by pointing `endpoint_url` at the compatible service and forcing
/// path-style addressing, the way MinIO deployments require.
pub struct S3Store {
    client: Client,
    media_bucket: String,
    thumbnail_bucket: String,
    export_bucket: String,
}

impl S3Store {
    pub async fn connect(
        endpoint_url: &str,
        access_key: &str,
        secret_key: &str,
        secure: bool,
        media_bucket: impl Into<String>,
        thumbnail_bucket: impl Into<String>,
        export_bucket: impl Into<String>,
    ) -> Self {
        let scheme = if secure { "https" } else { "http" };
        let endpoint = format!("{scheme}://{endpoint_url}");

        let credentials = Credentials::new(access_key, secret_key, None, None, "content-store");
        let config = aws_sdk_s3::Config::builder()
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .behavior_version_latest()
            .build();

        Self {
            client: Client::from_conf(config),
            media_bucket: media_bucket.into(),
            thumbnail_bucket: thumbnail_bucket.into(),
            export_bucket: export_bucket.into(),
        }
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Media => &self.media_bucket,
            Bucket::Thumbnails => &self.thumbnail_bucket,
            Bucket::Exports => &self.export_bucket,
        }
    }
}

#[async_trait]
impl Store for S3Store {
    async fn put(&self, bucket: Bucket, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<StoredObject, StoreError> {
        let size_bytes = bytes.len() as u64;

        self.client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;

        debug!(bucket = self.bucket_name(bucket), key, "uploaded object");
        Ok(StoredObject {
            bucket,
            key: key.to_string(),
            size_bytes,
        })
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.to_string().contains("NoSuchKey") {
                    StoreError::NotFound(key.to_string())
                } else {
                    StoreError::S3(err.to_string())
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        Ok(())
    }

    fn signed_url(&self, _bucket: Bucket, _key: &str, _expires_in_secs: u64) -> Result<String, StoreError> {
        Err(StoreError::S3(
            "S3Store::signed_url requires the async presigned_url API; call that directly".to_string(),
        ))
    }
}

impl S3Store {
    /// Presigned GET URL; separate from the [`Store`] trait because presigning
    /// is async in `aws-sdk-s3` while the trait method is sync for backend
    /// parity with [`crate::LocalStore`].
    pub async fn presigned_url(&self, bucket: Bucket, key: &str, expires_in_secs: u64) -> Result<String, StoreError> {
        let config = PresigningConfig::expires_in(Duration::from_secs(expires_in_secs))
            .map_err(|err| StoreError::S3(err.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .presigned(config)
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}
