//! Counter engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Connections registered
    pub connections_opened: AtomicU64,
    /// Connections removed (closed, failed, or shut down)
    pub connections_closed: AtomicU64,
    /// Increments applied to the counter state
    pub increments_applied: AtomicU64,
    /// Increments rejected as invalid input
    pub increments_rejected: AtomicU64,
    /// Messages delivered to connection buffers
    pub messages_sent: AtomicU64,
    /// Sends that failed and caused a removal
    pub send_failures: AtomicU64,
    /// Successful store flushes
    pub flushes_succeeded: AtomicU64,
    /// Failed store flushes
    pub flushes_failed: AtomicU64,
    /// Keys written to the store
    pub keys_persisted: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registered connection.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a removed connection.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an applied increment.
    pub fn increment_applied(&self) {
        self.increments_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected increment.
    pub fn increment_rejected(&self) {
        self.increments_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` delivered messages.
    pub fn messages_sent_count(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed send.
    pub fn send_failed(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful flush of `keys` entries.
    pub fn flush_succeeded(&self, keys: u64) {
        self.flushes_succeeded.fetch_add(1, Ordering::Relaxed);
        self.keys_persisted.fetch_add(keys, Ordering::Relaxed);
    }

    /// Record a failed flush.
    pub fn flush_failed(&self) {
        self.flushes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            increments_applied: self.increments_applied.load(Ordering::Relaxed),
            increments_rejected: self.increments_rejected.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            flushes_succeeded: self.flushes_succeeded.load(Ordering::Relaxed),
            flushes_failed: self.flushes_failed.load(Ordering::Relaxed),
            keys_persisted: self.keys_persisted.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections registered
    pub connections_opened: u64,
    /// Connections removed
    pub connections_closed: u64,
    /// Increments applied
    pub increments_applied: u64,
    /// Increments rejected
    pub increments_rejected: u64,
    /// Messages delivered
    pub messages_sent: u64,
    /// Failed sends
    pub send_failures: u64,
    /// Successful flushes
    pub flushes_succeeded: u64,
    /// Failed flushes
    pub flushes_failed: u64,
    /// Keys written to the store
    pub keys_persisted: u64,
}
