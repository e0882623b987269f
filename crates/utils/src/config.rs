//! Process-wide application configuration, loaded once from the environment.
//!
//! Mirrors the field set of the reference `Settings` object this platform was
//! modeled on, but loaded the way this codebase loads everything else: env
//! vars with `dotenvy`, parsed eagerly at boot so a misconfigured deployment
//! fails fast instead of tripping over a missing value mid-request.

use std::env;
use std::sync::Arc;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection_clip: String,
    pub collection_dino: String,
    pub collection_text: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub local_root: String,
    pub s3_endpoint: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub s3_secure: bool,
    pub media_bucket: String,
    pub thumbnail_bucket: String,
    pub export_bucket: String,
    pub signed_url_secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub database_url: String,
    pub bind_addr: String,

    pub jwt_secret: String,
    pub access_token_ttl_hours: u64,

    pub qdrant: QdrantConfig,
    pub store: StoreConfig,

    pub max_upload_size_bytes: u64,
    pub allowed_image_mime: Vec<String>,
    pub allowed_video_mime: Vec<String>,
    pub allowed_audio_mime: Vec<String>,

    pub billing_enabled: bool,
    pub rate_limiting_enabled: bool,
    pub default_storage_quota_bytes: u64,
    pub default_compute_quota_seconds: f64,
    pub default_api_rate_limit_per_hour: u32,
    pub default_training_gpu_hours_quota: f64,

    pub max_concurrent_training_jobs: u32,
    pub log_level: String,
}

impl AppConfig {
    /// Load from the environment, falling back to development defaults.
    /// Panics on malformed required values — an intentional fail-fast, not a
    /// `Result`, matching how this codebase treats boot-time misconfiguration.
    pub fn from_env() -> Arc<Self> {
        let _ = dotenvy::dotenv();

        let store_backend = match env_or("STORE_BACKEND", "local").to_lowercase().as_str() {
            "s3" => StoreBackend::S3,
            _ => StoreBackend::Local,
        };

        Arc::new(Self {
            environment: env_or("ENVIRONMENT", "development"),
            database_url: env_or("DATABASE_URL", "sqlite://./data/platform.sqlite"),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),

            jwt_secret: env_or("JWT_SECRET", "CHANGE-ME-IN-PRODUCTION"),
            access_token_ttl_hours: env_u64("ACCESS_TOKEN_TTL_HOURS", 24),

            qdrant: QdrantConfig {
                url: env_or("QDRANT_URL", "http://localhost:6334"),
                api_key: env::var("QDRANT_API_KEY").ok().filter(|s| !s.is_empty()),
                collection_clip: env_or("QDRANT_COLLECTION_CLIP", "clip_embeddings"),
                collection_dino: env_or("QDRANT_COLLECTION_DINO", "dino_embeddings"),
                collection_text: env_or("QDRANT_COLLECTION_TEXT", "text_embeddings"),
            },

            store: StoreConfig {
                backend: store_backend,
                local_root: env_or("STORE_LOCAL_ROOT", "./data/blobs"),
                s3_endpoint: env_or("S3_ENDPOINT", "localhost:9000"),
                s3_access_key: env_or("S3_ACCESS_KEY", "minioadmin"),
                s3_secret_key: env_or("S3_SECRET_KEY", "minioadmin"),
                s3_secure: env_bool("S3_SECURE", false),
                media_bucket: env_or("MEDIA_BUCKET", "media"),
                thumbnail_bucket: env_or("THUMBNAIL_BUCKET", "thumbnails"),
                export_bucket: env_or("EXPORT_BUCKET", "exports"),
                signed_url_secret: env_or("SIGNED_URL_SECRET", "CHANGE-ME-IN-PRODUCTION"),
            },

            max_upload_size_bytes: env_u64("MAX_UPLOAD_SIZE_MB", 2048) * 1024 * 1024,
            allowed_image_mime: split_csv(&env_or(
                "ALLOWED_IMAGE_TYPES",
                "image/jpeg,image/png,image/webp,image/gif,image/bmp,image/tiff",
            )),
            allowed_video_mime: split_csv(&env_or(
                "ALLOWED_VIDEO_TYPES",
                "video/mp4,video/webm,video/quicktime,video/x-msvideo,video/x-matroska",
            )),
            allowed_audio_mime: split_csv(&env_or(
                "ALLOWED_AUDIO_TYPES",
                "audio/mpeg,audio/wav,audio/ogg,audio/flac,audio/aac",
            )),

            billing_enabled: env_bool("BILLING_ENABLED", false),
            rate_limiting_enabled: env_bool("RATE_LIMITING_ENABLED", true),
            default_storage_quota_bytes: env_u64("DEFAULT_STORAGE_QUOTA_GB", 50) * 1024 * 1024 * 1024,
            default_compute_quota_seconds: env_f64("DEFAULT_COMPUTE_QUOTA_HOURS", 100.0) * 3600.0,
            default_api_rate_limit_per_hour: env_u64("DEFAULT_API_RATE_LIMIT", 1000) as u32,
            default_training_gpu_hours_quota: env_f64("DEFAULT_TRAINING_GPU_HOURS_QUOTA", 20.0),

            max_concurrent_training_jobs: env_u64("MAX_CONCURRENT_TRAINING_JOBS", 2) as u32,
            log_level: env_or("LOG_LEVEL", "info"),
        })
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_drops_empty() {
        assert_eq!(split_csv("a, b ,,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn env_bool_falls_back_on_missing() {
        assert!(env_bool("UTILS_TEST_NONEXISTENT_FLAG", true));
    }
}
