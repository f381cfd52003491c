mod batch;
mod config;
mod document;
mod errors;
mod forecast;
mod llm_client;
mod routes;
mod state;
mod storage;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::batch::{BatchOrchestrator, ProgressRegistry, TimingStore};
use crate::config::Config;
use crate::document::{ChromeRenderer, DocumentRenderer, LayoutOptions};
use crate::forecast::{ForecastPipeline, OutputStore};
use crate::llm_client::{LlmClient, OfflineGenerator, TextGenerator};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{S3Uploader, Uploader};

/// How often abandoned progress sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Forecast API v{}", env!("CARGO_PKG_VERSION"));

    // Text generator: Anthropic, or the canned offline forecast
    let generator: Arc<dyn TextGenerator> = if config.use_llm {
        let api_key = config
            .anthropic_api_key
            .clone()
            .context("ANTHROPIC_API_KEY is required when USE_LLM is enabled")?;
        info!("LLM client initialized (model: {})", llm_client::MODEL);
        Arc::new(LlmClient::new(api_key)?)
    } else {
        info!("USE_LLM=false, using the offline generator");
        Arc::new(OfflineGenerator)
    };

    // Browser renderer, closed once on shutdown
    let renderer = Arc::new(ChromeRenderer::new(config.chrome_bin.clone()));

    // Optional S3 / MinIO uploads
    let uploader: Option<Arc<dyn Uploader>> = match &config.s3 {
        Some(s3) => {
            info!("S3 uploads enabled (bucket: {})", s3.bucket);
            let uploader: Arc<dyn Uploader> = Arc::new(S3Uploader::from_config(s3).await);
            Some(uploader)
        }
        None => {
            info!("S3_BUCKET not set, uploads disabled");
            None
        }
    };

    tokio::fs::create_dir_all(&config.generated_dir)
        .await
        .with_context(|| format!("creating {}", config.generated_dir.display()))?;

    let pipeline = Arc::new(ForecastPipeline::new(
        generator,
        renderer.clone(),
        uploader,
        OutputStore::new(config.generated_dir.clone(), config.public_base_url.clone()),
        LayoutOptions {
            paragraphs_per_page: config.paragraphs_per_page,
        },
    ));

    let timing = Arc::new(TimingStore::load(config.timing_file.clone()).await);
    let progress = Arc::new(ProgressRegistry::new(config.progress_session_ttl));
    let sweeper = progress.clone().spawn_sweeper(SWEEP_INTERVAL);

    let batch = Arc::new(BatchOrchestrator::new(
        pipeline.clone(),
        progress.clone(),
        timing,
        config.batch.clone(),
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        pipeline,
        batch,
        progress,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    renderer.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
