//! Top-level counter engine that owns the configured instance.

use std::sync::Arc;

use tracing::info;

use tally_core::config::AppConfig;
use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;

use crate::counter::actor::CounterActor;
use crate::metrics::RealtimeMetrics;
use crate::persistence::scheduler::FlushReport;

/// Central engine routing requests to the counter actor.
///
/// One process serves exactly one instance (`counter.instance`); any
/// other name is reported as not found.
#[derive(Clone)]
pub struct CounterEngine {
    /// The single counter actor.
    pub main: Arc<CounterActor>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
}

impl std::fmt::Debug for CounterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterEngine")
            .field("instance", &self.main.name())
            .finish()
    }
}

impl CounterEngine {
    /// Creates the engine and its actor. Nothing is read until [`start`].
    ///
    /// [`start`]: CounterEngine::start
    pub fn new(config: &AppConfig, store: Arc<dyn CounterStore>) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let main = CounterActor::new(
            config.counter.instance.clone(),
            &config.counter,
            &config.realtime,
            store,
            metrics.clone(),
        );

        info!(
            instance = %config.counter.instance,
            mode = ?config.counter.mode,
            "Counter engine initialized"
        );

        Self { main, metrics }
    }

    /// Hydrate the counter.
    pub async fn start(&self) -> AppResult<()> {
        self.main.start().await
    }

    /// Look up an instance by name.
    pub fn instance(&self, name: &str) -> AppResult<Arc<CounterActor>> {
        if name == self.main.name() {
            Ok(self.main.clone())
        } else {
            Err(AppError::not_found(format!("Counter instance '{name}' not found")))
        }
    }

    /// The configured instance.
    pub fn main(&self) -> &Arc<CounterActor> {
        &self.main
    }

    /// Metrics collector.
    pub fn metrics(&self) -> &Arc<RealtimeMetrics> {
        &self.metrics
    }

    /// Initiates a graceful shutdown of the engine.
    pub async fn shutdown(&self) -> AppResult<FlushReport> {
        info!("Shutting down counter engine");
        let report = self.main.shutdown().await?;
        info!("Counter engine shut down");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::error::ErrorKind;
    use tally_store::memory::MemoryStore;

    #[tokio::test]
    async fn test_unknown_instance_is_not_found() {
        let engine = CounterEngine::new(&AppConfig::default(), Arc::new(MemoryStore::new()));
        assert!(engine.instance("main").is_ok());
        let err = engine.instance("other").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_dirty_keys() {
        let store = MemoryStore::new();
        let mut config = AppConfig::default();
        config.counter.mode = tally_core::config::CounterMode::Scalar;
        let engine = CounterEngine::new(&config, Arc::new(store.clone()));

        engine.start().await.unwrap();
        engine.main().on_increment(None).await.unwrap();
        let report = engine.shutdown().await.unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(store.get("count").await.unwrap(), Some(1));
    }
}
