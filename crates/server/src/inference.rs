//! Glue between the configured inference endpoint and the `services` crate's
//! encoder/keyframe traits.

use services::encoders::{ClipImageEncoder, ClipTextEncoder, DinoImageEncoder, TextEncoder, VlmCaptioner};
use services::enrichment::clip::KeyframeExtractor;
use services::error::ServiceError;

/// No video decoder ships with this deployment — video keyframe extraction
/// requires an external decoder (ffmpeg or similar) that isn't part of the
/// ambient stack, so `ClipImageWorker` is given a stub that fails cleanly
/// instead of a real extractor. Video media falls back to FAILED indexing
/// on the CLIP pipeline until a decoder-backed implementation replaces this.
pub struct UnsupportedKeyframeExtractor;

#[async_trait::async_trait]
impl KeyframeExtractor for UnsupportedKeyframeExtractor {
    async fn extract_middle_keyframe(&self, _video_bytes: &[u8]) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError::Encoder("video keyframe extraction is not configured in this deployment".to_string()))
    }
}

/// `HttpInferenceClient` implements all four encoder traits; these re-exports
/// let `AppState` construction wrap one client instance in four `Arc<dyn _>`
/// trait objects without naming the concrete type at each call site.
pub fn as_clip_image(client: std::sync::Arc<services::encoders::HttpInferenceClient>) -> std::sync::Arc<dyn ClipImageEncoder> {
    client
}
pub fn as_clip_text(client: std::sync::Arc<services::encoders::HttpInferenceClient>) -> std::sync::Arc<dyn ClipTextEncoder> {
    client
}
pub fn as_dino_image(client: std::sync::Arc<services::encoders::HttpInferenceClient>) -> std::sync::Arc<dyn DinoImageEncoder> {
    client
}
pub fn as_text_encoder(client: std::sync::Arc<services::encoders::HttpInferenceClient>) -> std::sync::Arc<dyn TextEncoder> {
    client
}
pub fn as_vlm_captioner(client: std::sync::Arc<services::encoders::HttpInferenceClient>) -> std::sync::Arc<dyn VlmCaptioner> {
    client
}
