//! Storage Engine Module
//!
//! This module provides the core storage functionality for MiniKV.
//! It includes a thread-safe, sharded key-value store with TTL support,
//! the background expiry sweeper and snapshot persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...N     │           │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! │                 ExpiryQueue (min-heap)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use minikv::storage::{StorageEngine, Value};
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set("name", Value::from("Ariz"), Duration::ZERO);
//! assert_eq!(engine.get("name"), Some(Value::from("Ariz")));
//!
//! // Set with TTL
//! engine.set("session", Value::from("token123"), Duration::from_secs(3600));
//! assert!(engine.ttl("session").is_some());
//! ```

pub mod engine;
pub mod expiry;
pub mod snapshot;

pub use engine::{Entry, StorageEngine, StorageStats, Value, DEFAULT_SHARDS};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpiryQueue, ExpirySweeper};
pub use snapshot::{PersistenceError, Snapshot, SnapshotEntry};
