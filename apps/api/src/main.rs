mod config;
mod db;
mod documents;
mod errors;
mod intelligence;
mod llm_client;
mod matching;
mod models;
mod routes;
mod skills;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::intelligence::backends::BackendRegistry;
use crate::intelligence::cache::ExtractionCache;
use crate::matching::store::PgMatchStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV/JD intelligence API v{}", env!("CARGO_PKG_VERSION"));
    info!("LLM backends: {:?}", config.llm);

    // PostgreSQL (match log)
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgMatchStore::new(db));

    // Redis (LLM reply cache; connects lazily)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let cache = ExtractionCache::new(redis, config.extraction_cache_ttl_secs);
    info!("Extraction cache configured (ttl {}s)", config.extraction_cache_ttl_secs);

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    let backends = BackendRegistry::new(config.backend_settings(), Some(cache))?;
    info!("LLM backend registry ready");

    let state = AppState {
        store,
        s3,
        backends,
        classifier: config.classifier,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "cvjd-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
