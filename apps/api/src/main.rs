use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobflow::cache::{MemoryCache, ReadThroughCache, RedisCache};
use jobflow::config::Config;
use jobflow::gmail::GmailClient;
use jobflow::inbox::registry::ScanRegistry;
use jobflow::llm_client::LlmClient;
use jobflow::postings::page::PageFetcher;
use jobflow::routes::build_router;
use jobflow::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobFlow API v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?;
    info!("LLM client initialized (model: {})", llm.model());

    let gmail = GmailClient::new()?;
    let pages = PageFetcher::new()?;

    let cache: Arc<dyn ReadThroughCache> = match &config.redis_url {
        Some(url) => {
            let redis = RedisCache::open(url, config.cache_ttl_secs)?;
            info!("Extraction cache: Redis (ttl {}s)", config.cache_ttl_secs);
            Arc::new(redis)
        }
        None => {
            info!(
                "Extraction cache: in-memory, ttl {}s (REDIS_URL not set)",
                config.cache_ttl_secs
            );
            Arc::new(MemoryCache::new(Duration::from_secs(config.cache_ttl_secs)))
        }
    };

    info!(
        "Scan batches: width {}, pause {}ms",
        config.scan_batch_width, config.scan_chunk_pause_ms
    );

    let state = AppState {
        llm,
        gmail,
        pages,
        config: config.clone(),
        cache,
        scans: ScanRegistry::new(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
