//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcut_ai::GeminiClient;
use reelcut_api::{create_router, metrics, ApiConfig, AppState};
use reelcut_media::{FfmpegConfig, FfmpegTool};
use reelcut_store::{InMemoryJobStore, JobStore};
use reelcut_worker::{JobExecutor, Pipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,reelcut=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting reelcut-api");

    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    let mut worker_config = WorkerConfig::from_env();
    // Clips are served from the directory the pipeline writes to
    worker_config.clips_dir = config.clips_dir.clone();

    let extractor = match GeminiClient::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create Gemini client: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let executor = JobExecutor::new(worker_config.clone());
    let media = Arc::new(
        FfmpegTool::new(FfmpegConfig::from_env()).with_cancel(executor.cancel_signal()),
    );
    let pipeline = Arc::new(Pipeline::new(
        worker_config,
        Arc::clone(&store),
        media.clone(),
        extractor.clone(),
    ));

    let state = AppState::new(config.clone(), store, executor.submitter(), media, extractor);
    let shutdown = executor.shutdown_handle();
    let executor_task = tokio::spawn(executor.run(pipeline));

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    // HTTP is down; stop the executor and let running jobs wind down
    shutdown.shutdown();
    match executor_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Executor error: {}", e),
        Err(e) => error!("Executor task panicked: {}", e),
    }

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
