//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use tally_core::config::AppConfig;
use tally_realtime::CounterEngine;

/// Application state passed to every handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Counter engine
    pub engine: CounterEngine,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Build state around an engine.
    pub fn new(config: Arc<AppConfig>, engine: CounterEngine) -> Self {
        Self {
            config,
            engine,
            started_at: Instant::now(),
        }
    }
}
