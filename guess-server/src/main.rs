use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use guess_core::{GuessService, InMemoryStore, OrderedStore, StoreCleanup};
use guess_persistence::{SqlOrderedStore, connection::connect_and_migrate};
use guess_server::{config::Config, create_routes};

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn OrderedStore>> {
    match &config.database_url {
        Some(database_url) => {
            let db = connect_and_migrate(database_url)
                .await
                .with_context(|| format!("Failed to open database at {database_url}"))?;
            info!("Persisting guesses to {}", database_url);
            Ok(Arc::new(SqlOrderedStore::new(db)))
        }
        None => {
            info!("DATABASE_URL not set, keeping guesses in memory");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting guess ledger server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = match build_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to initialize store: {:#}", e);
            std::process::exit(1);
        }
    };

    let addr: std::net::IpAddr = match config.host.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };

    let guess_service = Arc::new(GuessService::new(store.clone(), config.ledger_config()));
    let routes = create_routes(guess_service);

    // Start expiry sweep task
    let _cleanup = StoreCleanup::new(Duration::from_secs(config.expiry_sweep_seconds.max(1)))
        .spawn(store);

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown((addr, config.port), shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

async fn shutdown_signal() {
    // Wait for SIGINT (Ctrl+C) or SIGTERM
    #[cfg(unix)]
    {
        let (mut sigint, mut sigterm) = match (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            _ => {
                tracing::warn!("Failed to install signal handlers, falling back to Ctrl+C");
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {}", e);
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
