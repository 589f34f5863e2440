//! Server Configuration
//!
//! Command-line options for the `minikv` server binary.

use crate::storage::{ExpiryConfig, DEFAULT_SHARDS};
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound accepted for `--shards`
const MAX_SHARDS: usize = 4096;

/// Server configuration
#[derive(Parser, Debug, Clone)]
#[command(
    name = "minikv",
    version,
    about = "MiniKV - in-memory key-value store over a line protocol"
)]
pub struct ServerConfig {
    /// Host to bind to (loopback by default; use 0.0.0.0 for remote clients)
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of independently locked store shards (1 = one store-wide lock)
    #[arg(long, default_value_t = DEFAULT_SHARDS, value_parser = parse_shards)]
    pub shards: usize,

    /// How long the expiry sweeper sleeps when no expiration is pending
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub sweeper_idle_ms: u64,

    /// Snapshot file loaded on startup and written on shutdown
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_shards(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if (1..=MAX_SHARDS).contains(&n) => Ok(n),
        _ => Err(format!("invalid shard count '{s}': expected 1..={MAX_SHARDS}")),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            shards: DEFAULT_SHARDS,
            sweeper_idle_ms: 1000,
            snapshot: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sweeper settings derived from the command line.
    pub fn expiry_config(&self) -> ExpiryConfig {
        ExpiryConfig {
            idle_interval: Duration::from_millis(self.sweeper_idle_ms.max(1)),
        }
    }
}
