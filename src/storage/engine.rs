//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the core storage engine for MiniKV.
//! It provides a concurrent key space whose values are either plain strings
//! or rank tables, each with an optional expiry deadline.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over independently locked shards. With a
//!    single shard the engine degenerates to one store-wide lock.
//! 2. **Exclusive Locks**: Every operation holds its shard's `Mutex` for its full
//!    duration, so read-modify-write sequences on a key are atomic.
//! 3. **Lazy + Active Expiry**: Reads check the deadline themselves; the
//!    [`ExpiryQueue`] records every deadline so a background sweeper can remove
//!    keys that are never read again.
//! 4. **Tracked Expiry**: The deadline stored in an [`Entry`] is the only one that
//!    counts. Active expiry deletes a key only when its tracked deadline is
//!    exactly the one that came due.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ Mutex   │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! │                      ExpiryQueue                            │
//! │               (min-heap of pending deadlines)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! No operation spans more than one key, so shards never need to be locked
//! together.

use crate::storage::expiry::ExpiryQueue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default number of shards for the storage engine.
pub const DEFAULT_SHARDS: usize = 16;

/// A stored value.
///
/// The set of shapes is closed: a key holds either a string or a rank table
/// mapping member names to integer ranks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Value {
    /// Plain text value
    String(String),
    /// Member name to rank mapping, queried by `ZRANK`
    RankTable(HashMap<String, i64>),
}

impl Value {
    /// Builds a rank table from `(member, rank)` pairs.
    pub fn rank_table<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = (M, i64)>,
        M: Into<String>,
    {
        Value::RankTable(members.into_iter().map(|(m, r)| (m.into(), r)).collect())
    }

    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::RankTable(_) => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::RankTable(table) => {
                let mut members: Vec<(&String, &i64)> = table.iter().collect();
                members.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
                for (i, (member, rank)) in members.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}:{}", member, rank)?;
                }
                Ok(())
            }
        }
    }
}

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The actual value stored
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry. A zero `ttl` means the entry never expires, and so
    /// does a `ttl` too large to be represented as a deadline.
    pub fn new(value: Value, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };

        Self { value, expires_at }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks if this entry has expired as of `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Returns the remaining TTL, or None if no expiry.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}

/// A single shard containing a portion of the key space.
#[derive(Debug, Default)]
struct Shard {
    data: Mutex<HashMap<String, Entry>>,
}

impl Shard {
    /// Locks the shard. A panic in another holder never takes the store down
    /// with it; the map itself is always left in a consistent state.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Database statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub keys: u64,
    pub get_ops: u64,
    pub set_ops: u64,
    pub del_ops: u64,
    pub expired: u64,
}

/// The main storage engine for MiniKV.
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// all client handler tasks and the expiry sweeper. All operations are
/// thread-safe.
///
/// # Example
///
/// ```
/// use minikv::storage::{StorageEngine, Value};
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set("name", Value::from("Ariz"), Duration::ZERO);
/// assert_eq!(engine.get("name"), Some(Value::from("Ariz")));
///
/// engine.set("board", Value::rank_table([("alice", 1), ("bob", 2)]), Duration::ZERO);
/// assert_eq!(engine.zrank("board", "bob"), Some(2));
/// ```
pub struct StorageEngine {
    /// Sharded storage for reduced lock contention
    shards: Vec<Shard>,

    /// Deadlines waiting for active expiry
    expiry: ExpiryQueue,

    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
}

impl fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("pending_expiries", &self.expiry.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a new storage engine with [`DEFAULT_SHARDS`] shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates a storage engine with `count` shards (at least one).
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1)).map(|_| Shard::default()).collect();

        Self {
            shards,
            expiry: ExpiryQueue::default(),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    #[inline]
    fn get_shard(&self, key: &str) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    pub(crate) fn expiry_queue(&self) -> &ExpiryQueue {
        &self.expiry
    }

    /// Sets a key, fully replacing any existing entry.
    ///
    /// A zero `ttl` means the key never expires. Otherwise the new deadline
    /// becomes the key's tracked expiry and is queued for active expiry.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was replaced.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let key = key.into();
        let entry = Entry::new(value, ttl);
        let deadline = entry.expires_at;

        let shard = self.get_shard(&key);
        let mut data = shard.lock();

        let previous = match deadline {
            Some(at) => {
                let previous = data.insert(key.clone(), entry);
                // Queued while the shard is still locked, so the sweeper can
                // never observe the deadline before the entry carrying it.
                self.expiry.schedule(key, at);
                previous
            }
            None => data.insert(key, entry),
        };

        previous.map_or(true, |old| old.is_expired())
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired entry
    /// found here is removed on the spot (lazy expiry).
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.get_shard(key).lock();
        match data.get(key) {
            Some(entry) if entry.is_expired() => {
                data.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Deletes a key and its tracked expiry.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was deleted, `false` if it didn't exist.
    pub fn delete(&self, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.get_shard(key).lock();
        match data.remove(key) {
            Some(entry) if entry.is_expired() => {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Looks up the rank of `member` in the rank table stored at `key`.
    ///
    /// A missing key, an expired key, a key holding a string and a missing
    /// member are all plain lookup misses.
    pub fn zrank(&self, key: &str, member: &str) -> Option<i64> {
        let mut data = self.get_shard(key).lock();
        let entry = data.get(key)?;

        if entry.is_expired() {
            data.remove(key);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match &entry.value {
            Value::RankTable(table) => table.get(member).copied(),
            Value::String(_) => None,
        }
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &str) -> bool {
        let data = self.get_shard(key).lock();
        data.get(key).map(|e| !e.is_expired()).unwrap_or(false)
    }

    /// Returns the remaining time-to-live of a key.
    ///
    /// Returns `None` if the key doesn't exist, has expired, or never expires.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let data = self.get_shard(key).lock();
        data.get(key)
            .filter(|e| !e.is_expired())
            .and_then(Entry::remaining_ttl)
    }

    /// Deletes `key` only if its tracked expiry is exactly `at`.
    ///
    /// This is what active expiry calls when a deadline comes due. A key that
    /// was set again after `at` was scheduled carries a different deadline (or
    /// none) and is left alone.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was deleted.
    pub fn expire_if_current(&self, key: &str, at: Instant) -> bool {
        let mut data = self.get_shard(key).lock();

        let current = data.get(key).map(|e| e.expires_at == Some(at));
        if current != Some(true) {
            return false;
        }

        data.remove(key);
        self.expired_count.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Key expired and deleted");
        true
    }

    /// Runs active expiry for every queued deadline at or before `now`.
    ///
    /// # Returns
    ///
    /// Returns the number of keys that were deleted.
    pub fn expire_due(&self, now: Instant) -> u64 {
        self.expiry
            .pop_due(now)
            .into_iter()
            .filter(|(key, at)| self.expire_if_current(key, *at))
            .count() as u64
    }

    /// Returns the number of entries physically held, including expired
    /// entries that have not been removed yet.
    pub fn len(&self) -> u64 {
        self.shards.iter().map(|s| s.lock().len() as u64).sum()
    }

    /// Returns true if the database holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns database statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Visits every live entry, one shard at a time.
    pub(crate) fn for_each_live<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Entry),
    {
        let now = Instant::now();
        for shard in &self.shards {
            let data = shard.lock();
            for (key, entry) in data.iter().filter(|(_, e)| !e.is_expired_at(now)) {
                f(key, entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn text(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();

        engine.set("key", text("value"), Duration::ZERO);
        assert_eq!(engine.get("key"), Some(text("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get("nonexistent"), None);
    }

    #[test]
    fn test_set_replaces_entry() {
        let engine = StorageEngine::new();

        assert!(engine.set("key", text("v1"), Duration::from_secs(60)));
        assert!(!engine.set("key", text("v2"), Duration::ZERO));

        assert_eq!(engine.get("key"), Some(text("v2")));
        // The replacement carries no expiry of its own
        assert_eq!(engine.ttl("key"), None);
    }

    #[test]
    fn test_delete() {
        let engine = StorageEngine::new();

        assert!(!engine.delete("key"));

        engine.set("key", text("value"), Duration::ZERO);
        assert!(engine.delete("key"));
        assert_eq!(engine.get("key"), None);
        assert!(!engine.delete("key"));
    }

    #[test]
    fn test_delete_drops_tracked_expiry() {
        let engine = StorageEngine::new();

        engine.set("key", text("value"), Duration::from_secs(60));
        let at = engine.expiry_queue().next_deadline().unwrap();

        assert!(engine.delete("key"));
        engine.set("key", text("again"), Duration::ZERO);

        assert!(!engine.expire_if_current("key", at));
        assert_eq!(engine.get("key"), Some(text("again")));
    }

    #[test]
    fn test_expiry() {
        let engine = StorageEngine::new();

        engine.set("key", text("value"), Duration::from_millis(50));

        assert_eq!(engine.get("key"), Some(text("value")));

        thread::sleep(Duration::from_millis(100));

        assert_eq!(engine.get("key"), None);
        // Lazy expiry physically removed it
        assert_eq!(engine.len(), 0);
        assert_eq!(engine.stats().expired, 1);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let engine = StorageEngine::new();

        engine.set("key", text("value"), Duration::ZERO);
        assert_eq!(engine.expiry_queue().len(), 0);
        assert_eq!(engine.ttl("key"), None);
        assert!(engine.exists("key"));
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let engine = StorageEngine::new();

        engine.set("key", text("value"), Duration::MAX);
        assert_eq!(engine.get("key"), Some(text("value")));
        assert_eq!(engine.ttl("key"), None);
        assert!(engine.expiry_queue().is_empty());
    }

    #[test]
    fn test_ttl() {
        let engine = StorageEngine::new();

        assert_eq!(engine.ttl("missing"), None);

        engine.set("expiring", text("value"), Duration::from_secs(100));
        let ttl = engine.ttl("expiring").unwrap();
        assert!(ttl > Duration::from_secs(99) && ttl <= Duration::from_secs(100));
    }

    #[test]
    fn test_expire_if_current_requires_exact_deadline() {
        let engine = StorageEngine::new();

        engine.set("key", text("v1"), Duration::from_secs(60));
        let first = engine.expiry_queue().next_deadline().unwrap();

        thread::sleep(Duration::from_millis(2));
        engine.set("key", text("v2"), Duration::from_secs(120));

        assert!(!engine.expire_if_current("key", first));
        assert_eq!(engine.get("key"), Some(text("v2")));

        let deadlines = engine.expiry_queue().pop_due(Instant::now() + Duration::from_secs(600));
        let (_, second) = deadlines.last().cloned().unwrap();
        assert!(engine.expire_if_current("key", second));
        assert_eq!(engine.get("key"), None);
    }

    #[test]
    fn test_expire_due_skips_superseded_deadlines() {
        let engine = StorageEngine::new();

        engine.set("short", text("v1"), Duration::from_millis(10));
        engine.set("short", text("v2"), Duration::from_secs(60));
        engine.set("gone", text("x"), Duration::from_millis(10));

        thread::sleep(Duration::from_millis(30));

        assert_eq!(engine.expire_due(Instant::now()), 1);
        assert_eq!(engine.get("short"), Some(text("v2")));
        assert!(!engine.exists("gone"));
        // The long deadline is still pending
        assert_eq!(engine.expiry_queue().len(), 1);
    }

    #[test]
    fn test_zrank() {
        let engine = StorageEngine::new();

        engine.set(
            "leaderboard",
            Value::rank_table([("alice", 1), ("bob", 2)]),
            Duration::ZERO,
        );

        assert_eq!(engine.zrank("leaderboard", "alice"), Some(1));
        assert_eq!(engine.zrank("leaderboard", "bob"), Some(2));
        assert_eq!(engine.zrank("leaderboard", "carol"), None);
        assert_eq!(engine.zrank("missing", "alice"), None);
    }

    #[test]
    fn test_zrank_on_string_is_a_miss() {
        let engine = StorageEngine::new();

        engine.set("name", text("alice"), Duration::ZERO);
        assert_eq!(engine.zrank("name", "alice"), None);
        // The string value is untouched
        assert_eq!(engine.get("name"), Some(text("alice")));
    }

    #[test]
    fn test_zrank_on_expired_table() {
        let engine = StorageEngine::new();

        engine.set(
            "board",
            Value::rank_table([("alice", 3)]),
            Duration::from_millis(20),
        );
        thread::sleep(Duration::from_millis(50));

        assert_eq!(engine.zrank("board", "alice"), None);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_rank_table_display() {
        let value = Value::rank_table([("carol", 2), ("alice", 1), ("bob", 2)]);
        assert_eq!(value.to_string(), "alice:1 bob:2 carol:2");
        assert_eq!(text("hello world").to_string(), "hello world");
    }

    #[test]
    fn test_single_shard() {
        let engine = StorageEngine::with_shards(0);
        assert_eq!(engine.shard_count(), 1);

        for i in 0..100 {
            engine.set(format!("key{}", i), text("v"), Duration::ZERO);
        }
        assert_eq!(engine.len(), 100);
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();

        engine.set("a", text("1"), Duration::ZERO);
        engine.set("b", text("2"), Duration::ZERO);
        engine.get("a");
        engine.get("missing");
        engine.delete("b");

        let stats = engine.stats();
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.set_ops, 2);
        assert_eq!(stats.get_ops, 2);
        assert_eq!(stats.del_ops, 1);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn test_concurrent_writers_same_key() {
        let engine = Arc::new(StorageEngine::new());
        engine.set("other", text("untouched"), Duration::ZERO);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for _ in 0..200 {
                        engine.set("contended", Value::from(format!("v{}", i)), Duration::ZERO);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let written: HashSet<String> = (0..16).map(|i| format!("v{}", i)).collect();
        let value = engine.get("contended").unwrap();
        assert!(written.contains(value.as_str().unwrap()));
        assert_eq!(engine.get("other"), Some(text("untouched")));
        assert_eq!(engine.len(), 2);
    }
}
