//! MiniKV - A Small In-Memory Key-Value Store
//!
//! This is the main entry point for the MiniKV server.
//! It sets up logging, the storage engine and the TCP listener, and saves a
//! snapshot on the way out when one is configured.

use clap::Parser;
use minikv::commands::CommandHandler;
use minikv::config::ServerConfig;
use minikv::connection::ConnectionStats;
use minikv::storage::{ExpirySweeper, StorageEngine};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
MiniKV v{} - In-Memory Key-Value Store
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        minikv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Create the storage engine (shared across all connections)
    let storage = Arc::new(StorageEngine::with_shards(config.shards));
    info!(shards = storage.shard_count(), "Storage engine initialized");

    if let Some(path) = &config.snapshot {
        storage.load_from_file(path)?;
    }

    let _sweeper = ExpirySweeper::start(Arc::clone(&storage), config.expiry_config());

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    print_banner(&config);
    info!("Listening on {}", config.bind_address());

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let handler = CommandHandler::new(Arc::clone(&storage));
    minikv::server::run(listener, handler, Arc::clone(&stats), shutdown).await;

    if let Some(path) = &config.snapshot {
        if let Err(e) = storage.save_to_file(path) {
            error!(error = %e, "Failed to save snapshot");
        }
    }

    let storage_stats = storage.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        keys = storage_stats.keys,
        expired = storage_stats.expired,
        "Server shutdown complete"
    );
    Ok(())
}
