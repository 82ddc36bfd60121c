//! Refresh Cache server binary
//!
//! Serves the rendered feed views over HTTP with a background sweeper
//! keeping cached pages warm.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refresh_cache::api::create_router;
use refresh_cache::feed::{sample_articles, FeedStore, MemoryFeedStore};
use refresh_cache::{spawn_sweeper_task, AppState, Config};

/// Startup sequence:
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache with the view renderer registered
/// 4. Start the background refresh sweeper
/// 5. Serve HTTP until SIGINT/SIGTERM, then release the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refresh_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Refresh Cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, refresh_interval={}ms, sweep_tick={}ms, port={}",
        config.capacity, config.refresh_interval_ms, config.sweep_tick_ms, config.server_port
    );

    let feed: Arc<dyn FeedStore> = Arc::new(MemoryFeedStore::new(sample_articles()));
    let state = AppState::from_config(&config, feed);
    let cache = Arc::clone(&state.cache);
    info!("Artifact cache initialized");

    let sweeper_handle = spawn_sweeper_task(Arc::clone(&cache), config.sweep_tick());
    info!("Background refresh sweeper started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweeper_handle))
        .await
        .context("Server error")?;

    cache.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweeper.
async fn shutdown_signal(sweeper_handle: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweeper_handle.abort();
    warn!("Refresh sweeper aborted");
}
