//! RaceIntel Server
//!
//! Main server application: adaptive live feed poller and REST API

use anyhow::Result;
use ri_server::{api, config::ServerConfig, poller::Poller, state};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting RaceIntel Server");

    let config = ServerConfig::from_env()?;

    // Create application state
    let state = state::AppState::new();

    // Build the router
    let app = api::create_router(state.clone());

    // Start poller in background
    let source = config.feed_source()?;
    info!("Polling {} feed", source.name());
    let cancel = CancellationToken::new();
    let poller = tokio::spawn(
        Poller::new(source, state.clone())
            .with_fetch_timeout(config.fetch_timeout)
            .run(cancel.clone()),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    poller.await?;

    info!("RaceIntel Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, cancelling the poller
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown requested");
    cancel.cancel();
}
