use std::sync::Arc;

use content_store::{LocalStore, S3Store, Store};
use db::DBService;
use services::billing::BillingService;
use services::dispatcher::Dispatcher;
use services::encoders::{EncoderConfig, HttpInferenceClient};
use services::enrichment::{AugmentationWorker, ClipImageWorker, DinoImageWorker, TextEmbeddingWorker, VlmCaptionWorker};
use services::search::SearchEngine;
use services::training::TrainingController;
use sqlx::SqlitePool;
use utils::config::StoreBackend;
use utils::AppConfig;
use vector_index::VectorIndex;

use crate::collaboration::Hub;
use crate::inference;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub index: Arc<VectorIndex>,
    pub hub: Arc<Hub>,

    pub search_engine: Arc<SearchEngine>,
    pub dispatcher: Arc<Dispatcher>,
    pub training: Arc<TrainingController>,
    pub billing: Arc<BillingService>,

    pub clip_worker: Arc<ClipImageWorker>,
    pub dino_worker: Arc<DinoImageWorker>,
    pub vlm_worker: Arc<VlmCaptionWorker>,
    pub text_worker: Arc<TextEmbeddingWorker>,
    pub augmentation_worker: Arc<AugmentationWorker>,
}

impl AppState {
    pub async fn build(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let db = DBService::connect(&config.database_url).await?;
        let pool = db.pool;

        let index = Arc::new(VectorIndex::connect(&config.qdrant)?);
        index.ensure_collections().await?;

        let store: Arc<dyn Store> = match config.store.backend {
            StoreBackend::Local => Arc::new(LocalStore::new(
                config.store.local_root.clone(),
                config.store.signed_url_secret.clone(),
                format!("http://{}", config.bind_addr),
            )),
            StoreBackend::S3 => Arc::new(
                S3Store::connect(
                    &config.store.s3_endpoint,
                    &config.store.s3_access_key,
                    &config.store.s3_secret_key,
                    config.store.s3_secure,
                    config.store.media_bucket.clone(),
                    config.store.thumbnail_bucket.clone(),
                    config.store.export_bucket.clone(),
                )
                .await,
            ),
        };

        let inference_base_url = std::env::var("INFERENCE_SERVICE_URL").unwrap_or_else(|_| "http://localhost:9100".to_string());
        let encoder_config = EncoderConfig { base_url: inference_base_url, request_timeout: std::time::Duration::from_secs(60) };
        let inference_client = Arc::new(HttpInferenceClient::new(encoder_config));

        let clip_image = inference::as_clip_image(inference_client.clone());
        let clip_text = inference::as_clip_text(inference_client.clone());
        let dino_image = inference::as_dino_image(inference_client.clone());
        let text_encoder = inference::as_text_encoder(inference_client.clone());
        let vlm_captioner = inference::as_vlm_captioner(inference_client);

        let search_engine = Arc::new(SearchEngine::new(pool.clone(), index.clone(), clip_text, clip_image.clone(), text_encoder.clone()));

        let clip_worker = Arc::new(ClipImageWorker::new(
            pool.clone(),
            store.clone(),
            index.clone(),
            clip_image,
            Arc::new(inference::UnsupportedKeyframeExtractor),
        ));
        let dino_worker = Arc::new(DinoImageWorker::new(pool.clone(), store.clone(), index.clone(), dino_image));
        let vlm_worker = Arc::new(VlmCaptionWorker::new(pool.clone(), store.clone(), index.clone(), vlm_captioner, text_encoder.clone()));
        let text_worker = Arc::new(TextEmbeddingWorker::new(pool.clone(), index.clone(), text_encoder));
        let augmentation_worker = Arc::new(AugmentationWorker::new(pool.clone(), store.clone()));

        Ok(Self {
            pool: pool.clone(),
            config: config.clone(),
            store,
            index,
            hub: Arc::new(Hub::new()),
            search_engine,
            dispatcher: Arc::new(Dispatcher::new(pool.clone())),
            training: Arc::new(TrainingController::new(pool.clone())),
            billing: Arc::new(BillingService::new(pool, config.billing_enabled)),
            clip_worker,
            dino_worker,
            vlm_worker,
            text_worker,
            augmentation_worker,
        })
    }
}
