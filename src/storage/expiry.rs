//! Active Expiry
//!
//! Lazy expiry (checking on access) keeps reads correct, but a key that expires
//! and is never read again would otherwise stay in memory forever. This module
//! removes such keys in the background.
//!
//! ## Design
//!
//! Every `set` with a TTL pushes its `(deadline, key)` pair onto the engine's
//! [`ExpiryQueue`], a min-heap ordered by deadline. One [`ExpirySweeper`] task
//! services the whole heap:
//!
//! 1. Sleeps until the earliest pending deadline (or an idle interval when
//!    nothing is pending)
//! 2. Wakes early when a `set` queues a deadline earlier than the one it is
//!    sleeping towards
//! 3. Pops every deadline that has come due and asks the engine to delete the
//!    key only if that deadline is still the key's tracked expiry
//!
//! Deadlines belonging to overwritten or deleted keys are never cancelled.
//! They stay in the heap until they come due and then do nothing.

use crate::storage::StorageEngine;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};
use tracing::{debug, info, trace};

/// A deadline waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PendingExpiry {
    at: Instant,
    key: String,
}

/// Min-heap of pending expirations shared between the engine and the sweeper.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    heap: Mutex<BinaryHeap<Reverse<PendingExpiry>>>,
    /// Signalled when a new earliest deadline is queued
    notify: Notify,
}

impl ExpiryQueue {
    fn lock(&self) -> MutexGuard<'_, BinaryHeap<Reverse<PendingExpiry>>> {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `key` for deletion at `at`.
    pub fn schedule(&self, key: String, at: Instant) {
        let mut heap = self.lock();
        let earliest = heap.peek().map_or(true, |Reverse(next)| at < next.at);
        heap.push(Reverse(PendingExpiry { at, key }));
        drop(heap);

        if earliest {
            self.notify.notify_one();
        }
    }

    /// Returns the earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.lock().peek().map(|Reverse(next)| next.at)
    }

    /// Removes and returns every deadline at or before `now`, earliest first.
    pub fn pop_due(&self, now: Instant) -> Vec<(String, Instant)> {
        let mut heap = self.lock();
        let mut due = Vec::new();

        while heap.peek().is_some_and(|Reverse(next)| next.at <= now) {
            if let Some(Reverse(PendingExpiry { at, key })) = heap.pop() {
                due.push((key, at));
            }
        }

        due
    }

    /// Number of queued deadlines, including superseded ones.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Completes once a deadline earlier than every other queued one arrives.
    async fn rescheduled(&self) {
        self.notify.notified().await
    }
}

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// How long to sleep when no deadline is queued (default: 1s)
    pub idle_interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(1),
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use minikv::storage::{StorageEngine, ExpirySweeper, ExpiryConfig};
    /// use std::sync::Arc;
    ///
    /// let engine = Arc::new(StorageEngine::new());
    /// let sweeper = ExpirySweeper::start(engine, ExpiryConfig::default());
    ///
    /// // Dropping the sweeper will stop it
    /// drop(sweeper);
    /// ```
    pub fn start(engine: Arc<StorageEngine>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(engine, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    engine: Arc<StorageEngine>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let wake_at = match engine.expiry_queue().next_deadline() {
            Some(at) => tokio::time::Instant::from_std(at),
            None => tokio::time::Instant::now() + config.idle_interval,
        };

        tokio::select! {
            _ = tokio::time::sleep_until(wake_at) => {}
            _ = engine.expiry_queue().rescheduled() => {
                trace!("Earlier deadline queued, rescheduling sweeper");
                continue;
            }
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let expired = engine.expire_due(Instant::now());

        if expired > 0 {
            debug!(
                expired = expired,
                pending = engine.expiry_queue().len(),
                "Expired keys cleaned up"
            );
        }
    }
}

/// Starts the expiry sweeper with default configuration.
pub fn start_expiry_sweeper(engine: Arc<StorageEngine>) -> ExpirySweeper {
    ExpirySweeper::start(engine, ExpiryConfig::default())
}
