//! Model encoder clients. The actual CLIP/DINO/VLM/text-embedding models
//! run behind a separate inference service; these are thin HTTP clients
//! against that service, retried with [`backon`]. Per `spec.md` §9, encoders
//! are process-wide singletons — first use triggers a cold model load on
//! the inference side and may take tens of seconds, so callers must not
//! assume low latency.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;

use crate::error::ServiceError;

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub base_url: String,
    pub request_timeout: std::time::Duration,
}

fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default().with_max_times(3).with_jitter()
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    caption: String,
    tags: String,
}

/// Encodes an image (by URL or raw bytes) into the CLIP image embedding space.
#[async_trait]
pub trait ClipImageEncoder: Send + Sync {
    async fn encode_image(&self, bytes: &[u8]) -> Result<Vec<f32>, ServiceError>;
}

/// Encodes free text into the same CLIP embedding space as [`ClipImageEncoder`].
#[async_trait]
pub trait ClipTextEncoder: Send + Sync {
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

/// DINO self-supervised image embedding, used for visual-similarity search
/// independent of CLIP's text-aligned space.
#[async_trait]
pub trait DinoImageEncoder: Send + Sync {
    async fn encode_image(&self, bytes: &[u8]) -> Result<Vec<f32>, ServiceError>;
}

/// Sentence/caption text encoder backing the TEXT collection.
#[async_trait]
pub trait TextEncoder: Send + Sync {
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

/// VLM captioning: one free-form caption plus a comma-separated tag list,
/// and optionally a caller-supplied custom prompt.
#[async_trait]
pub trait VlmCaptioner: Send + Sync {
    async fn caption_and_tag(&self, bytes: &[u8]) -> Result<(String, Vec<String>), ServiceError>;
    async fn run_custom_prompt(&self, bytes: &[u8], prompt: &str) -> Result<String, ServiceError>;
}

/// Shared HTTP implementation backing all four encoder traits; the
/// inference service exposes one endpoint per modality under `base_url`.
pub struct HttpInferenceClient {
    client: reqwest::Client,
    config: EncoderConfig,
}

impl HttpInferenceClient {
    pub fn new(config: EncoderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self { client, config }
    }

    async fn post_embedding(&self, path: &str, body: serde_json::Value) -> Result<Vec<f32>, ServiceError> {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let body_ref = &body;
        let response = (|| async {
            self.client.post(&url).json(body_ref).send().await?.error_for_status()
        })
        .retry(retry_policy())
        .await?;

        let parsed: EmbeddingResponse = response.json().await?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl ClipImageEncoder for HttpInferenceClient {
    async fn encode_image(&self, bytes: &[u8]) -> Result<Vec<f32>, ServiceError> {
        let encoded = base64_encode(bytes);
        self.post_embedding("/clip/image", serde_json::json!({ "image_b64": encoded })).await
    }
}

#[async_trait]
impl ClipTextEncoder for HttpInferenceClient {
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.post_embedding("/clip/text", serde_json::json!({ "text": text })).await
    }
}

#[async_trait]
impl DinoImageEncoder for HttpInferenceClient {
    async fn encode_image(&self, bytes: &[u8]) -> Result<Vec<f32>, ServiceError> {
        let encoded = base64_encode(bytes);
        self.post_embedding("/dino/image", serde_json::json!({ "image_b64": encoded })).await
    }
}

#[async_trait]
impl TextEncoder for HttpInferenceClient {
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.post_embedding("/text/embed", serde_json::json!({ "text": text })).await
    }
}

#[async_trait]
impl VlmCaptioner for HttpInferenceClient {
    async fn caption_and_tag(&self, bytes: &[u8]) -> Result<(String, Vec<String>), ServiceError> {
        let encoded = base64_encode(bytes);
        let url = format!("{}/vlm/caption", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "image_b64": encoded, "max_new_tokens": 100 });
        let body_ref = &body;
        let response = (|| async {
            self.client.post(&url).json(body_ref).send().await?.error_for_status()
        })
        .retry(retry_policy())
        .await?;

        let parsed: CaptionResponse = response.json().await?;
        let tags = split_tags(&parsed.tags);
        Ok((parsed.caption, tags))
    }

    async fn run_custom_prompt(&self, bytes: &[u8], prompt: &str) -> Result<String, ServiceError> {
        let encoded = base64_encode(bytes);
        let url = format!("{}/vlm/prompt", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "image_b64": encoded, "prompt": prompt });
        let body_ref = &body;
        let response = (|| async {
            self.client.post(&url).json(body_ref).send().await?.error_for_status()
        })
        .retry(retry_policy())
        .await?;

        #[derive(Deserialize)]
        struct PromptResponse {
            result: String,
        }
        let parsed: PromptResponse = response.json().await?;
        Ok(parsed.result)
    }
}

/// Splits a comma-separated tag list, lowercasing, trimming, and dropping
/// empties — the exact VLM tag-prompt discipline from `spec.md` §4.D.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn base64_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    const CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let n = (b0 << 16) | (b1 << 8) | b2;
        let _ = write!(out, "{}", CHARS[((n >> 18) & 0x3F) as usize] as char);
        let _ = write!(out, "{}", CHARS[((n >> 12) & 0x3F) as usize] as char);
        out.push(if chunk.len() > 1 { CHARS[((n >> 6) & 0x3F) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { CHARS[(n & 0x3F) as usize] as char } else { '=' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_lowercases_trims_and_drops_empties() {
        let tags = split_tags(" Cat, dog ,, BIRD");
        assert_eq!(tags, vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn base64_matches_known_vector() {
        assert_eq!(base64_encode(b"hello"), "aGVsbG8=");
        assert_eq!(base64_encode(b""), "");
    }
}
