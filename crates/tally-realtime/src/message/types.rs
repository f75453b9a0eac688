//! Outbound WebSocket message definitions.
//!
//! The wire format is deliberately bare: a snapshot or update is either a
//! JSON object mapping keys to counts (`{"DE": 2, "DE.0": 1}`) or, for a
//! scalar counter, a bare integer (`42`). Only rejections carry an envelope.

use std::collections::BTreeMap;

use serde::Serialize;

/// Count values carried by a snapshot or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CountsPayload {
    /// The single count of a scalar counter.
    Scalar(u64),
    /// Key → count entries of a hierarchical counter.
    Keys(BTreeMap<String, u64>),
}

/// Messages sent by the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// Full state, sent once when a connection joins.
    Snapshot(CountsPayload),
    /// Values changed by one increment, broadcast to every connection.
    Update(CountsPayload),
    /// An increment from this connection was rejected.
    Error {
        /// Machine-readable error code.
        error: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Build a rejection message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            error: code.into(),
            message: message.into(),
        }
    }
}
