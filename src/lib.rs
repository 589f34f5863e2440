//! # MiniKV - A Small In-Memory Key-Value Store
//!
//! MiniKV keeps keys and values in memory and serves them over a plain text
//! protocol: one request per line, one response per line.
//!
//! ## Features
//!
//! - **Line Protocol**: `GET`, `SET`, `DELETE` and `ZRANK`, case-insensitive verbs
//! - **Typed Values**: a key holds either a string or a rank table
//! - **TTL Support**: entries can carry a deadline, enforced on read and in the background
//! - **Async I/O**: Built on Tokio, one task per client connection
//! - **Snapshots**: the key space can be saved to and loaded from a JSON file
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              MiniKV                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   Line      │    │              StorageEngine                   │   │
//! │  │   Parser    │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │  └─────────────┘    │  │Mutex   │ │Mutex   │ │Mutex   │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                                               │                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use minikv::storage::{StorageEngine, start_expiry_sweeper};
//! use minikv::commands::CommandHandler;
//! use minikv::connection::ConnectionStats;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let _sweeper = start_expiry_sweeper(Arc::clone(&storage));
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:7777").await.unwrap();
//!     let handler = CommandHandler::new(storage);
//!
//!     minikv::server::run(listener, handler, stats, async {
//!         tokio::signal::ctrl_c().await.ok();
//!     })
//!     .await;
//! }
//! ```
//!
//! ## Supported Commands
//!
//! | Request              | Success        | Miss                 |
//! |----------------------|----------------|----------------------|
//! | `GET key`            | the value      | `Key not found`      |
//! | `SET key value...`   | `OK`           |                      |
//! | `DELETE key`         | `OK`           | `Key not found`      |
//! | `ZRANK key member`   | the rank       | `Member not found`   |
//!
//! Lines with fewer than two tokens (or a `SET`/`ZRANK` missing its third)
//! get `Invalid command`; other verbs get `Unknown command`.
//!
//! ## Module Overview
//!
//! - [`protocol`]: line framing and response types
//! - [`storage`]: thread-safe storage engine, active expiry and snapshots
//! - [`commands`]: request parsing and dispatch
//! - [`connection`]: client connection management
//! - [`server`]: accept loop
//! - [`config`]: command-line configuration
//!
//! ## Lazy + Active Expiry
//!
//! Keys with TTL are expired in two ways:
//! 1. **Lazy**: When a key is accessed, we check if it's expired
//! 2. **Active**: A background task deletes each key when its deadline comes,
//!    unless the key has been written again since
//!
//! This ensures memory is reclaimed even for keys that are never accessed again.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::{Command, CommandError, CommandHandler};
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{FrameError, LineParser, Reply};
pub use storage::{
    start_expiry_sweeper, ExpiryConfig, ExpirySweeper, PersistenceError, StorageEngine, Value,
};

/// The default port MiniKV listens on
pub const DEFAULT_PORT: u16 = 7777;

/// The default host MiniKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of MiniKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
