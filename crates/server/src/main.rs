use server::{routes, state::AppState, workers};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(format!("warn,server={level},services={level},db={level}", level = log_level))
        .expect("valid tracing filter");
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_filter(filter)).init();

    let config = AppConfig::from_env();
    let bind_addr = config.bind_addr.clone();
    let max_upload_size_bytes = config.max_upload_size_bytes as usize;

    let state = AppState::build(config).await?;
    workers::spawn(state.clone());

    let app = routes::router(state)
        .layer(RequestBodyLimitLayer::new(max_upload_size_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("server listening on {bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
