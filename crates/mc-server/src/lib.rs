//! mc-server: the medcord HTTP API.
//!
//! Wires configuration, the metadata store, the ffmpeg backend and the
//! variant orchestrator into an axum server with bearer auth on the
//! mutating routes and Range-aware blob retrieval.

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod streaming;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mc_codec::{FfmpegBackend, ToolRegistry, VideoBackend};
use mc_core::config::Config;
use mc_ingest::Orchestrator;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the medcord server.
///
/// Opens the database, discovers ffmpeg/ffprobe, prepares the media
/// directories and serves until SIGINT/SIGTERM.
pub async fn start(config: Config) -> mc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    // Initialize database.
    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let pool_size = mc_db::pool::pool_size(&config.processing);
    let db = mc_db::pool::init_pool(db_path, pool_size)?;
    if existed {
        tracing::info!("Database opened (existing) at {}", db_path.display());
    } else {
        tracing::info!("Database created (new) at {}", db_path.display());
    }
    tracing::debug!(connections = pool_size, "Database pool ready");

    // Discover external tools.
    let tools = ToolRegistry::discover(&config.tools);
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}; video uploads will fail", info.name);
        }
    }

    let timeout = Duration::from_secs(config.processing.tool_timeout_secs);
    let backend: Arc<dyn VideoBackend> = match FfmpegBackend::from_registry(&tools, timeout) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::warn!("Falling back to bare ffmpeg/ffprobe names: {e}");
            Arc::new(FfmpegBackend::new("ffmpeg".into(), "ffprobe".into(), timeout))
        }
    };

    let orchestrator = Orchestrator::from_config(db, &config, backend);
    orchestrator.prepare().await?;
    tracing::info!(
        images = %orchestrator.image_store().root().display(),
        videos = %orchestrator.video_store().root().display(),
        image_workers = orchestrator.pools().image.size(),
        video_workers = orchestrator.pools().video.size(),
        "Media store ready"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| mc_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(Arc::new(config), orchestrator);
    let app = router::build_router(ctx);

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| mc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    let cancel = CancellationToken::new();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
pub async fn shutdown_signal(cancel: CancellationToken) {
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
