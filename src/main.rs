//! chatdeck - launcher backend for a chat-platform account
//!
//! Serves the launcher commands over a local HTTP API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatdeck::api::{create_router, AppState};
use chatdeck::config::Config;
use chatdeck::tasks::spawn_retention_sweep;

/// Main entry point for the chatdeck server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the store and build the session manager
/// 4. Start the background retention sweep
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM stop the sweep and destroy the live session
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatdeck=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting chatdeck");

    let config = Config::from_env();
    info!(
        "Configuration loaded: store={}, port={}, api={}, max_entry={}B, messages={:?}, sweep_interval={}s",
        config.store_path.display(),
        config.server_port,
        config.api_base_url,
        config.cache_max_entry_bytes,
        config.message_retention,
        config.retention_sweep_interval
    );

    let state = AppState::from_config(&config)
        .await
        .with_context(|| format!("opening store {}", config.store_path.display()))?;
    info!("Store opened");

    let sweep_handle = spawn_retention_sweep(state.sessions.clone(), config.retention_sweep_interval);
    info!("Retention sweep started");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("serving HTTP")?;

    if let Err(e) = state.shutdown().await {
        warn!("Session teardown on shutdown failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the sweep.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    sweep_handle.abort();
    warn!("Retention sweep aborted");
}
