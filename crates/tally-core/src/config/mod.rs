//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every section falls back to its defaults when absent.

pub mod app;
pub mod counter;
pub mod logging;
pub mod realtime;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::counter::{CounterConfig, CounterMode};
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;
pub use self::store::StoreConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (base file + environment overlay + `TALLY__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Counter actor settings.
    #[serde(default)]
    pub counter: CounterConfig,
    /// Real-time connection settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Durable store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the base file at `path` with `config/{env}.toml` and
    /// environment variables prefixed with `TALLY__`. Missing files are
    /// skipped, so an empty environment yields the defaults.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        parsed.validate()?;
        tracing::debug!(path, env, "Configuration loaded");
        Ok(parsed)
    }

    /// Reject settings the counter cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.counter.instance.trim().is_empty() {
            return Err(AppError::configuration("counter.instance must not be empty"));
        }
        if self.counter.flush_delay_ms == 0 {
            return Err(AppError::configuration(
                "counter.flush_delay_ms must be greater than zero",
            ));
        }
        if self.counter.hydrate_max_attempts == 0 {
            return Err(AppError::configuration(
                "counter.hydrate_max_attempts must be at least 1",
            ));
        }
        if self.counter.depth > crate::types::classification::MAX_BITS {
            return Err(AppError::configuration(format!(
                "counter.depth must be at most {}",
                crate::types::classification::MAX_BITS
            )));
        }
        if self.realtime.outbound_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.outbound_buffer_size must be greater than zero",
            ));
        }
        Ok(())
    }
}
