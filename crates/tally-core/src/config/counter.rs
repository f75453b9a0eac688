//! Counter actor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shape of the counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterMode {
    /// One key per classification prefix; snapshots are JSON objects.
    Hierarchical,
    /// A single `count` key; snapshots are bare integers.
    Scalar,
}

/// Counter actor and write-behind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Name of the instance the dispatcher routes to.
    #[serde(default = "default_instance")]
    pub instance: String,
    /// Scalar or hierarchical counting.
    #[serde(default = "default_mode")]
    pub mode: CounterMode,
    /// Fixed debounce window between the first dirty mark and its flush.
    #[serde(default = "default_flush_delay")]
    pub flush_delay_ms: u64,
    /// Force a final flush when the engine shuts down.
    #[serde(default = "default_true")]
    pub flush_on_shutdown: bool,
    /// Attempts at reading the store before start-up fails.
    #[serde(default = "default_hydrate_attempts")]
    pub hydrate_max_attempts: u32,
    /// Base backoff between hydration attempts (doubles every retry).
    #[serde(default = "default_hydrate_backoff")]
    pub hydrate_backoff_ms: u64,
    /// Exact number of address-derived bits below the region segment.
    /// Every classification must carry this many bits so the count tree
    /// has uniform depth.
    #[serde(default = "default_depth")]
    pub depth: usize,
}

impl CounterConfig {
    /// Debounce window as a [`Duration`].
    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }

    /// Base hydration backoff as a [`Duration`].
    pub fn hydrate_backoff(&self) -> Duration {
        Duration::from_millis(self.hydrate_backoff_ms)
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            mode: default_mode(),
            flush_delay_ms: default_flush_delay(),
            flush_on_shutdown: true,
            hydrate_max_attempts: default_hydrate_attempts(),
            hydrate_backoff_ms: default_hydrate_backoff(),
            depth: default_depth(),
        }
    }
}

fn default_instance() -> String {
    "main".to_string()
}

fn default_mode() -> CounterMode {
    CounterMode::Hierarchical
}

fn default_flush_delay() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_hydrate_attempts() -> u32 {
    5
}

fn default_hydrate_backoff() -> u64 {
    200
}

/// Parents equal the sum of their children only when every leaf sits at
/// the same depth, so a deployment picks one depth for all clients. Two-bit
/// inputs such as `DE` + `[0, 1]` need `depth = 2`.
fn default_depth() -> usize {
    4
}
