//! Connection registry — the set of live connections of one counter instance.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use tally_core::types::ConnectionId;

use crate::metrics::RealtimeMetrics;

use super::handle::{ConnectionHandle, ConnectionInfo};

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the message was queued for.
    pub delivered: usize,
    /// Connections whose send failed and that were removed.
    pub dropped: usize,
}

/// Thread-safe registry of live connections.
///
/// Only the counter actor adds connections, and it does so while holding
/// its serialization point, so a join snapshot is always queued before
/// any broadcast that follows it.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Connection ID → handle.
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            connections: DashMap::new(),
            metrics,
        }
    }

    /// Registers a connection after queueing `snapshot` as its first frame.
    ///
    /// Returns `false` if the snapshot could not be queued; the connection
    /// is then treated as already gone and is not registered.
    pub fn add(&self, handle: Arc<ConnectionHandle>, snapshot: String) -> bool {
        if let Err(failure) = handle.send(snapshot) {
            debug!(conn_id = %handle.id, ?failure, "Snapshot send failed, not registering");
            handle.mark_closed();
            self.metrics.send_failed();
            return false;
        }

        self.metrics.messages_sent_count(1);
        self.metrics.connection_opened();
        info!(
            conn_id = %handle.id,
            classification = ?handle.classification.as_ref().map(ToString::to_string),
            "Connection registered"
        );
        self.connections.insert(handle.id, handle);
        true
    }

    /// Removes a connection. Safe to call any number of times.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.connections.remove(conn_id)?;
        handle.mark_closed();
        self.metrics.connection_closed();
        info!(conn_id = %conn_id, "Connection removed");
        Some(handle)
    }

    /// Sends `frame` to every registered connection.
    ///
    /// A failed send removes that connection and never prevents delivery
    /// to the rest.
    pub fn broadcast(&self, frame: &str) -> BroadcastReport {
        let targets: Vec<Arc<ConnectionHandle>> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut report = BroadcastReport::default();
        for conn in &targets {
            match conn.send(frame.to_string()) {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    debug!(conn_id = %conn.id, ?failure, "Broadcast send failed, removing");
                    self.metrics.send_failed();
                    self.remove(&conn.id);
                    report.dropped += 1;
                }
            }
        }

        self.metrics.messages_sent_count(report.delivered as u64);
        report
    }

    /// Sends `frame` to one connection, removing it if the send fails.
    pub fn send_to(&self, conn_id: &ConnectionId, frame: String) -> bool {
        let Some(conn) = self.get(conn_id) else {
            return false;
        };
        match conn.send(frame) {
            Ok(()) => {
                self.metrics.messages_sent_count(1);
                true
            }
            Err(_) => {
                self.metrics.send_failed();
                self.remove(conn_id);
                false
            }
        }
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Whether a connection is registered.
    pub fn contains(&self, conn_id: &ConnectionId) -> bool {
        self.connections.contains_key(conn_id)
    }

    /// Returns total number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Info for every live connection.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|entry| entry.value().info())
            .collect()
    }

    /// Closes all connections.
    pub fn close_all(&self) {
        let ids: Vec<ConnectionId> = self.connections.iter().map(|entry| *entry.key()).collect();
        for id in &ids {
            self.remove(id);
        }
        info!(count = ids.len(), "All connections closed");
    }
}
