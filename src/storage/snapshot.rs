//! Snapshot Persistence
//!
//! Saves the live key space to a JSON file and loads it back. Only entries that
//! are still alive are written; each carries its remaining TTL so a restored
//! entry expires at roughly the same wall-clock moment it would have.
//!
//! ```text
//! {
//!   "version": 1,
//!   "entries": [
//!     { "key": "name", "value": { "type": "string", "data": "Ariz" } },
//!     { "key": "board", "value": { "type": "rank_table", "data": { "alice": 1 } }, "ttl_ms": 5000 }
//!   ]
//! }
//! ```

use crate::storage::{StorageEngine, Value};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors that can occur while saving or loading a snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed snapshot {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported snapshot version {found} (expected {})", SNAPSHOT_VERSION)]
    UnsupportedVersion { found: u32 },
}

/// A point-in-time copy of the key space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub entries: Vec<SnapshotEntry>,
}

/// One key in a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: Value,
    /// Remaining time-to-live; absent for keys that never expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
}

impl StorageEngine {
    /// Copies every live entry into a [`Snapshot`], sorted by key.
    ///
    /// Shards are copied one at a time, so writes racing with the snapshot may
    /// or may not be included.
    pub fn snapshot(&self) -> Snapshot {
        let mut entries = Vec::new();

        self.for_each_live(|key, entry| {
            entries.push(SnapshotEntry {
                key: key.to_string(),
                value: entry.value.clone(),
                ttl_ms: entry.remaining_ttl().map(|ttl| ttl.as_millis() as u64),
            });
        });

        entries.sort_by(|a, b| a.key.cmp(&b.key));

        Snapshot {
            version: SNAPSHOT_VERSION,
            entries,
        }
    }

    /// Inserts every entry of `snapshot`, replacing existing keys.
    ///
    /// Entries with a TTL are queued for active expiry again. Entries whose TTL
    /// ran out are skipped.
    ///
    /// # Returns
    ///
    /// Returns the number of keys restored.
    pub fn restore(&self, snapshot: Snapshot) -> Result<usize, PersistenceError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: snapshot.version,
            });
        }

        let mut restored = 0;
        for entry in snapshot.entries {
            let ttl = match entry.ttl_ms {
                Some(0) => {
                    debug!(key = %entry.key, "Skipping expired snapshot entry");
                    continue;
                }
                Some(ms) => Duration::from_millis(ms),
                None => Duration::ZERO,
            };
            self.set(entry.key, entry.value, ttl);
            restored += 1;
        }

        Ok(restored)
    }

    /// Writes a snapshot of the key space to `path`.
    ///
    /// The file is written next to its destination first and then renamed
    /// over it, so a crash never leaves a half-written snapshot behind.
    ///
    /// # Returns
    ///
    /// Returns the number of keys written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<usize, PersistenceError> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        let count = snapshot.entries.len();

        let json = serde_json::to_vec_pretty(&snapshot).map_err(|source| {
            PersistenceError::Format {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let tmp = path.with_extension("tmp");
        let io_err = |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;

        info!(path = %path.display(), keys = count, "Snapshot saved");
        Ok(count)
    }

    /// Loads a snapshot from `path` into the store.
    ///
    /// A missing file is treated as an empty snapshot.
    ///
    /// # Returns
    ///
    /// Returns the number of keys restored.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<usize, PersistenceError> {
        let path = path.as_ref();

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot found, starting empty");
                return Ok(0);
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Format {
                path: path.to_path_buf(),
                source,
            })?;

        let restored = self.restore(snapshot)?;
        info!(path = %path.display(), keys = restored, "Snapshot loaded");
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("minikv-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("save-load");
        let engine = StorageEngine::new();

        engine.set("name", Value::from("Ariz"), Duration::ZERO);
        engine.set("session", Value::from("token"), Duration::from_secs(3600));
        engine.set(
            "board",
            Value::rank_table([("alice", 1), ("bob", 2)]),
            Duration::ZERO,
        );

        assert_eq!(engine.save_to_file(&path).unwrap(), 3);

        let restored = StorageEngine::new();
        assert_eq!(restored.load_from_file(&path).unwrap(), 3);

        assert_eq!(restored.get("name"), Some(Value::from("Ariz")));
        assert_eq!(restored.get("session"), Some(Value::from("token")));
        assert!(restored.ttl("session").unwrap() > Duration::from_secs(3500));
        assert_eq!(restored.zrank("board", "bob"), Some(2));
        // TTL'd entries go back on the expiry queue
        assert_eq!(restored.expiry_queue().len(), 1);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let engine = StorageEngine::new();
        let loaded = engine.load_from_file(temp_path("does-not-exist")).unwrap();
        assert_eq!(loaded, 0);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_load_malformed_file() {
        let path = temp_path("malformed");
        std::fs::write(&path, b"not json").unwrap();

        let engine = StorageEngine::new();
        let err = engine.load_from_file(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Format { .. }));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_snapshot_skips_expired_entries() {
        let engine = StorageEngine::new();

        engine.set("live", Value::from("v"), Duration::ZERO);
        engine.set("dead", Value::from("v"), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].key, "live");
        assert_eq!(snapshot.entries[0].ttl_ms, None);
    }

    #[test]
    fn test_restore_skips_zero_ttl_and_checks_version() {
        let engine = StorageEngine::new();

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            entries: vec![
                SnapshotEntry {
                    key: "gone".to_string(),
                    value: Value::from("v"),
                    ttl_ms: Some(0),
                },
                SnapshotEntry {
                    key: "kept".to_string(),
                    value: Value::from("v"),
                    ttl_ms: None,
                },
            ],
        };
        assert_eq!(engine.restore(snapshot.clone()).unwrap(), 1);
        assert!(engine.exists("kept"));
        assert!(!engine.exists("gone"));

        let future = Snapshot {
            version: SNAPSHOT_VERSION + 1,
            ..snapshot
        };
        assert!(matches!(
            engine.restore(future),
            Err(PersistenceError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_value_wire_shape() {
        let entry = SnapshotEntry {
            key: "board".to_string(),
            value: Value::rank_table([("alice", 1)]),
            ttl_ms: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "key": "board",
                "value": { "type": "rank_table", "data": { "alice": 1 } }
            })
        );
    }
}
