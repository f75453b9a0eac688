//! Individual client connection handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tally_core::types::{Classification, ConnectionId};

/// Why a message could not be handed to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The connection was already closed.
    Closed,
    /// The outbound buffer is full; the client is not keeping up.
    Full,
}

/// A handle to a single live client transport.
///
/// Holds the sender half of the connection's outbound queue; the transport
/// task owns the receiver and forwards every queued frame to the socket.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Classification the client connected with, if any
    pub classification: Option<Classification>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Sender for outbound frames
    sender: mpsc::Sender<String>,
    /// Cancelled once the connection is removed
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle and the receiver for its outbound frames.
    pub fn channel(
        classification: Option<Classification>,
        buffer_size: usize,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (sender, rx) = mpsc::channel(buffer_size);
        let handle = Arc::new(Self {
            id: ConnectionId::new(),
            classification,
            connected_at: Utc::now(),
            sender,
            closed: CancellationToken::new(),
        });
        (handle, rx)
    }

    /// Queue a frame for this connection.
    ///
    /// Never waits: a full buffer counts as a failure so one slow client
    /// cannot stall delivery to the others.
    pub fn send(&self, frame: String) -> Result<(), SendFailure> {
        if self.is_closed() {
            return Err(SendFailure::Closed);
        }
        match self.sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(SendFailure::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                Err(SendFailure::Closed)
            }
        }
    }

    /// Whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.sender.is_closed()
    }

    /// Mark the connection as closed
    pub fn mark_closed(&self) {
        self.closed.cancel();
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            classification: self.classification.as_ref().map(ToString::to_string),
            connected_at: self.connected_at,
            alive: !self.is_closed(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Classification key chain leaf, e.g. `DE.0.1`
    pub classification: Option<String>,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Is alive
    pub alive: bool,
}
