//! ftpd-core — entry point
//!
//! Loads the settings file, starts the lifecycle manager around the
//! built-in acceptor engine, and runs until interrupted.

use log::{error, info};
use std::sync::Arc;

use ftpd_core::config::SettingsStore;
use ftpd_core::engine::TcpAcceptor;
use ftpd_core::server::{ConnectionCounter, PortCache, ServerManager};

const SETTINGS_FILE: &str = "ftpserver.ini";
const COUNTER_FILE: &str = "connection_count.json";

#[tokio::main]
async fn main() {
    // env_logger picks up the RUST_LOG environment variable.
    env_logger::init();

    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SETTINGS_FILE.to_string());
    let store = SettingsStore::new(settings_path);
    let config = match store.load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let counter = Arc::new(ConnectionCounter::with_persistence(COUNTER_FILE));
    if let Some(record) = counter.last_persisted() {
        info!(
            "previous session left {} connection(s) on record",
            record.count
        );
    }

    let manager = ServerManager::new(Arc::new(TcpAcceptor), Arc::new(PortCache::new()), counter);

    info!("serving {} on port {}", config.directory_str(), config.port);
    if let Err(e) = manager.start(config).await {
        error!("failed to start server: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to wait for shutdown signal: {}", e);
    }
    info!("shutdown requested");
    if let Err(e) = manager.stop().await {
        error!("shutdown error: {}", e);
    }
}
