//! Server startup and graceful shutdown

use crate::constants::RATE_LIMIT_SWEEP_INTERVAL_SECS;
use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use folio_infra::start_bucket_sweeper;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Start the server with graceful shutdown
pub async fn start_server(state: Arc<AppState>, app: Router) -> Result<()> {
    let config = &state.config;
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let sweeper = start_bucket_sweeper(
        state.rate_limiter.clone(),
        Duration::from_secs(RATE_LIMIT_SWEEP_INTERVAL_SECS),
    );

    tracing::info!(
        max_file_mb = config.max_file_size_bytes / 1024 / 1024,
        upload_dir = %config.upload_dir.display(),
        environment = %config.environment,
        trusted_proxy_count = config.trusted_proxy_count,
        max_concurrent_jobs = state.pipeline.config().max_concurrent_jobs,
        "Server ready and accepting connections"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    Ok(())
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM.
///
/// # Panics
/// Panics if a signal handler cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
    folio_infra::shutdown_telemetry().await;
}
