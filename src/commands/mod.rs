//! Command Handler Module
//!
//! This module implements the command processing layer for MiniKV.
//! It receives request lines, parses them into commands, executes them
//! against the storage engine, and returns one reply per line.
//!
//! ## Architecture
//!
//! ```text
//! Client Request Line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Command::parse  │  (command module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (handler module)
//! │                 │
//! │  - Validate     │
//! │  - Dispatch     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `GET`, `SET`, `DELETE`, `ZRANK`

pub mod command;
pub mod handler;

pub use command::{Command, CommandError};
pub use handler::CommandHandler;
