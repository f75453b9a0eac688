//! Real-time WebSocket settings.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound message buffer per connection. A connection whose buffer
    /// is full is treated as disconnected.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}
