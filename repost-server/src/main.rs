//! Repost Server - HTTP front end for the repost detection engine
//!
//! Endpoints:
//! - POST /intake: Queue posts for fingerprinting
//! - DELETE /intake/pending: Discard queued posts
//! - GET /intake/status: Scheduler state and counters
//! - GET /matches/{identity}: Duplicate status of a recorded post
//! - POST /matches/{identity}/refresh: Recompute against the current store
//! - GET /records, GET /records/{identity}: Stored records
//! - GET /health, GET /ready: Monitoring

use std::net::SocketAddr;

use repost_core::Engine;
use repost_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,repost_core=debug")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = config.engine.database_url.as_deref().unwrap_or("memory"),
        threshold = config.engine.matcher.threshold,
        cooldown_ms = config.engine.scheduler.cooldown.as_millis() as u64,
        mock_fingerprints = config.engine.source.is_mock(),
        "Starting repost-server"
    );

    let engine = match Engine::start(config.engine.clone()).await {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start engine");
            std::process::exit(1);
        }
    };
    let state = AppState::new(engine);
    let app = create_router_with_config(&config, state.clone());

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "Listening");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(e) = served {
        tracing::error!(error = %e, "Server error");
    }

    tracing::info!("Draining intake scheduler");
    state.engine.shutdown().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
