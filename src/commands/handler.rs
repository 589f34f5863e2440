//! Command Handler Module
//!
//! This module parses incoming request lines and dispatches them to the
//! storage engine, producing exactly one [`Reply`] per line.
//!
//! ## Supported Commands
//!
//! - `GET key` - Get a key's value
//! - `SET key value [value ...]` - Set a key that never expires
//! - `DELETE key` - Delete a key
//! - `ZRANK key member` - Look up a member's rank in a rank table
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   parse()   │───>│  dispatch() │───>│   cmd_*()   │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      StorageEngine          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::Command;
use crate::protocol::Reply;
use crate::storage::{StorageEngine, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Executes request lines against a shared storage engine.
///
/// The handler keeps no per-request state, so clones can be handed to every
/// connection.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Returns the storage engine this handler writes to.
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Executes one request line and returns the response.
    pub fn execute(&self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(command) => self.dispatch(command),
            Err(e) => {
                trace!(error = %e, "Rejected request");
                e.into()
            }
        }
    }

    /// Dispatches a parsed command to its handler.
    pub fn dispatch(&self, command: Command) -> Reply {
        trace!(command = command.name(), key = command.key(), "Executing command");

        match command {
            Command::Get { key } => self.cmd_get(&key),
            Command::Set { key, value } => self.cmd_set(key, value),
            Command::Delete { key } => self.cmd_delete(&key),
            Command::ZRank { key, member } => self.cmd_zrank(&key, &member),
        }
    }

    /// GET key
    fn cmd_get(&self, key: &str) -> Reply {
        match self.storage.get(key) {
            Some(value) => Reply::Value(value.to_string()),
            None => Reply::KeyNotFound,
        }
    }

    /// SET key value...
    ///
    /// The protocol has no TTL syntax; values written here never expire.
    fn cmd_set(&self, key: String, value: String) -> Reply {
        self.storage.set(key, Value::String(value), Duration::ZERO);
        Reply::Ok
    }

    /// DELETE key
    fn cmd_delete(&self, key: &str) -> Reply {
        if self.storage.delete(key) {
            Reply::Ok
        } else {
            Reply::KeyNotFound
        }
    }

    /// ZRANK key member
    fn cmd_zrank(&self, key: &str, member: &str) -> Reply {
        match self.storage.zrank(key, member) {
            Some(rank) => Reply::Rank(rank),
            None => Reply::MemberNotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        let storage = Arc::new(StorageEngine::new());
        CommandHandler::new(storage)
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        assert_eq!(handler.execute("SET foo bar"), Reply::Ok);
        assert_eq!(handler.execute("GET foo"), Reply::value("bar"));
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();
        assert_eq!(handler.execute("GET missing"), Reply::KeyNotFound);
    }

    #[test]
    fn test_delete() {
        let handler = create_handler();

        handler.execute("SET foo bar");
        assert_eq!(handler.execute("DELETE foo"), Reply::Ok);
        assert_eq!(handler.execute("GET foo"), Reply::KeyNotFound);
        assert_eq!(handler.execute("DELETE foo"), Reply::KeyNotFound);
    }

    #[test]
    fn test_set_multi_word_value() {
        let handler = create_handler();

        assert_eq!(handler.execute("set greeting hello   there world"), Reply::Ok);
        assert_eq!(
            handler.execute("get greeting"),
            Reply::value("hello there world")
        );
    }

    #[test]
    fn test_set_overwrites() {
        let handler = create_handler();

        handler.execute("SET foo one");
        handler.execute("SET foo two");
        assert_eq!(handler.execute("GET foo"), Reply::value("two"));
    }

    #[test]
    fn test_set_never_expires() {
        let handler = create_handler();

        handler.execute("SET foo bar");
        assert_eq!(handler.storage().ttl("foo"), None);
        assert!(handler.storage().expiry_queue().is_empty());
    }

    #[test]
    fn test_zrank_missing_key() {
        let handler = create_handler();
        assert_eq!(
            handler.execute("ZRANK leaderboard alice"),
            Reply::MemberNotFound
        );
    }

    #[test]
    fn test_zrank_rank_table() {
        let handler = create_handler();
        handler.storage().set(
            "leaderboard",
            Value::rank_table([("alice", 1), ("bob", 7)]),
            Duration::ZERO,
        );

        assert_eq!(handler.execute("ZRANK leaderboard bob"), Reply::Rank(7));
        assert_eq!(handler.execute("zrank leaderboard alice"), Reply::Rank(1));
        assert_eq!(
            handler.execute("ZRANK leaderboard carol"),
            Reply::MemberNotFound
        );
    }

    #[test]
    fn test_zrank_on_string_key() {
        let handler = create_handler();

        handler.execute("SET name alice");
        assert_eq!(handler.execute("ZRANK name alice"), Reply::MemberNotFound);
    }

    #[test]
    fn test_get_rank_table() {
        let handler = create_handler();
        handler.storage().set(
            "leaderboard",
            Value::rank_table([("bob", 2), ("alice", 1)]),
            Duration::ZERO,
        );

        assert_eq!(
            handler.execute("GET leaderboard"),
            Reply::value("alice:1 bob:2")
        );
    }

    #[test]
    fn test_arity_errors() {
        let handler = create_handler();

        assert_eq!(handler.execute(""), Reply::InvalidCommand);
        assert_eq!(handler.execute("GET"), Reply::InvalidCommand);
        assert_eq!(handler.execute("SET foo"), Reply::InvalidCommand);
        assert_eq!(handler.execute("ZRANK board"), Reply::InvalidCommand);
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();
        assert_eq!(handler.execute("FOO bar"), Reply::UnknownCommand);
    }

    #[test]
    fn test_handlers_share_storage() {
        let first = create_handler();
        let second = first.clone();

        first.execute("SET shared yes");
        assert_eq!(second.execute("GET shared"), Reply::value("yes"));
    }
}
