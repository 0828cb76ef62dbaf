//! Media cache server - local HTTP sidecar over the media cache
//!
//! Owns the process-wide MediaCache: sweeps it at startup and periodically,
//! serves it to UI consumers, and closes it on shutdown.

mod error;
mod server;
mod sweeper;
mod types;

use crate::error::Result;
use crate::server::{start_server, ServerState, SharedState};
use crate::sweeper::spawn_sweeper;
use crate::types::ServerConfig;
use media_cache::MediaCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("media_cache=info".parse()?)
        .add_directive("media_cache_server=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting media cache server...");

    let config = ServerConfig::from_env();
    info!("Port: {}", config.port);
    info!("Backend: {:?}", config.cache.backend);
    info!("Store path: {:?}", config.cache.db_path);
    info!("Cache TTL: {} seconds", config.cache.ttl_secs);

    let cache = Arc::new(MediaCache::from_config(&config.cache));

    // Startup sweep also opens the store
    let removed = cache.sweep_expired().await;
    if cache.is_store_available().await {
        info!(removed, "Startup sweep finished");
    } else {
        warn!("Running without a persistent store; media will be passed through");
    }

    let sweeper = (config.sweep_interval_secs > 0).then(|| {
        spawn_sweeper(
            cache.clone(),
            Duration::from_secs(config.sweep_interval_secs),
        )
    });

    let state: SharedState = Arc::new(ServerState::new(cache.clone()));

    let served = start_server(state, config.port, shutdown_signal()).await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    cache.close().await;
    info!("Media cache server stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
