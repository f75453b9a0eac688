//! Response DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tally_realtime::Lifecycle;
use tally_realtime::connection::ConnectionInfo;
use tally_realtime::counter::CountNode;
use tally_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
    /// Counter lifecycle.
    pub lifecycle: Lifecycle,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// Overall status (`ok` or `degraded`).
    pub status: String,
    /// Counter instance name.
    pub instance: String,
    /// Counter lifecycle.
    pub lifecycle: Lifecycle,
    /// Store provider name.
    pub store: String,
    /// Whether the store answered its health check.
    pub store_healthy: bool,
    /// Number of live WebSocket connections.
    pub connections: usize,
    /// The live connections themselves.
    pub live_connections: Vec<ConnectionInfo>,
    /// Keys waiting for the next flush.
    pub dirty_keys: usize,
    /// Engine metrics.
    pub metrics: MetricsSnapshot,
}

/// Result of `POST /increment`.
#[derive(Debug, Clone, Serialize)]
pub struct IncrementResponse {
    /// New value of every touched key.
    pub updated: BTreeMap<String, u64>,
    /// Connections the update was queued for.
    pub delivered: usize,
}

/// All counts with the recomputed root aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct CountsResponse {
    /// Sum of every depth-1 key.
    pub root: u64,
    /// Every key.
    pub counts: BTreeMap<String, u64>,
    /// The same counts as a rollup tree.
    pub tree: CountNode,
}

/// One key and its direct children.
#[derive(Debug, Clone, Serialize)]
pub struct KeyCountResponse {
    /// The key.
    pub key: String,
    /// Its count.
    pub count: u64,
    /// Keys one level below it.
    pub children: BTreeMap<String, u64>,
}
