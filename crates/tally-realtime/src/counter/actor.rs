//! The counter actor: exclusive owner of one counter instance.
//!
//! Every state change (hydration, increment, join) runs while holding the
//! actor's state lock. Broadcasts and registry inserts happen inside that
//! critical section too, so each client observes its join snapshot first
//! and then every later update in increment order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, info, warn};

use tally_core::config::{CounterConfig, CounterMode, RealtimeConfig};
use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;
use tally_core::types::{Classification, ConnectionId, SCALAR_KEY};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::message::serializer::serialize_outbound;
use crate::message::types::{CountsPayload, OutboundMessage};
use crate::metrics::RealtimeMetrics;
use crate::persistence::scheduler::{FlushReport, WriteBehindScheduler};

use super::aggregator::KeyAggregator;
use super::state::CounterState;

/// Hydration lifecycle of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Not started yet.
    Uninitialized,
    /// Reading the durable store.
    Hydrating,
    /// Serving connections and increments.
    Ready,
    /// Hydration gave up; requests are refused.
    Failed,
}

/// A newly registered connection and its outbound frame queue.
#[derive(Debug)]
pub struct Connection {
    /// Registry handle.
    pub handle: Arc<ConnectionHandle>,
    /// Frames to forward to the transport, starting with the snapshot.
    pub outbound: mpsc::Receiver<String>,
}

/// Result of an applied increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementOutcome {
    /// New value of every touched key.
    pub updated: BTreeMap<String, u64>,
    /// Connections the update was queued for.
    pub delivered: usize,
}

/// Single-writer owner of a counter's state, connections and persistence.
#[derive(Debug)]
pub struct CounterActor {
    name: String,
    mode: CounterMode,
    aggregator: KeyAggregator,
    state: Mutex<CounterState>,
    lifecycle: watch::Sender<Lifecycle>,
    registry: ConnectionRegistry,
    scheduler: WriteBehindScheduler,
    metrics: Arc<RealtimeMetrics>,
    outbound_buffer_size: usize,
    hydrate_max_attempts: u32,
    hydrate_backoff: Duration,
    flush_on_shutdown: bool,
}

impl CounterActor {
    /// Create an actor in the [`Lifecycle::Uninitialized`] state.
    pub fn new(
        name: impl Into<String>,
        counter: &CounterConfig,
        realtime: &RealtimeConfig,
        store: Arc<dyn CounterStore>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Arc<Self> {
        let (lifecycle, _) = watch::channel(Lifecycle::Uninitialized);
        Arc::new(Self {
            name: name.into(),
            mode: counter.mode,
            aggregator: KeyAggregator::new(counter.mode, counter.depth),
            state: Mutex::new(CounterState::new()),
            lifecycle,
            registry: ConnectionRegistry::new(metrics.clone()),
            scheduler: WriteBehindScheduler::new(store, counter.flush_delay(), metrics.clone()),
            metrics,
            outbound_buffer_size: realtime.outbound_buffer_size.max(1),
            hydrate_max_attempts: counter.hydrate_max_attempts.max(1),
            hydrate_backoff: counter.hydrate_backoff(),
            flush_on_shutdown: counter.flush_on_shutdown,
        })
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Counter mode.
    pub fn mode(&self) -> CounterMode {
        self.mode
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    /// Live connections.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Write-behind scheduler.
    pub fn scheduler(&self) -> &WriteBehindScheduler {
        &self.scheduler
    }

    /// Hydrate from the store, or wait for a hydration already under way.
    ///
    /// Safe to call any number of times; only the first call reads the
    /// store. Returns once the actor is ready, or a service-unavailable
    /// error if hydration failed.
    pub async fn start(&self) -> AppResult<()> {
        let claimed = self.lifecycle.send_if_modified(|state| {
            if *state == Lifecycle::Uninitialized {
                *state = Lifecycle::Hydrating;
                true
            } else {
                false
            }
        });

        if claimed {
            self.hydrate().await
        } else {
            self.wait_ready().await
        }
    }

    async fn hydrate(&self) -> AppResult<()> {
        // Held for the whole read so nothing observes a partial state.
        let mut state = self.state.lock().await;
        let mut backoff = self.hydrate_backoff;

        for attempt in 1..=self.hydrate_max_attempts {
            match self.scheduler.load_all().await {
                Ok(entries) => {
                    *state = CounterState::from_entries(entries);
                    let violations = state.rollup_violations();
                    if !violations.is_empty() {
                        warn!(
                            counter = %self.name,
                            keys = ?violations,
                            "Hydrated counts do not roll up"
                        );
                    }
                    self.lifecycle.send_replace(Lifecycle::Ready);
                    info!(counter = %self.name, keys = state.len(), attempt, "Counter hydrated");
                    return Ok(());
                }
                Err(e) if attempt < self.hydrate_max_attempts => {
                    warn!(
                        counter = %self.name,
                        attempt,
                        error = %e,
                        retry_in_ms = backoff.as_millis() as u64,
                        "Hydration failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => {
                    error!(counter = %self.name, attempt, error = %e, "Hydration failed, giving up");
                    self.lifecycle.send_replace(Lifecycle::Failed);
                    return Err(AppError::service_unavailable(format!(
                        "Counter '{}' could not be hydrated: {}",
                        self.name, e.message
                    )));
                }
            }
        }

        self.lifecycle.send_replace(Lifecycle::Failed);
        Err(AppError::service_unavailable(format!(
            "Counter '{}' could not be hydrated",
            self.name
        )))
    }

    /// Wait until hydration has finished.
    pub async fn wait_ready(&self) -> AppResult<()> {
        let mut rx = self.lifecycle.subscribe();
        let current = *rx
            .wait_for(|s| matches!(s, Lifecycle::Ready | Lifecycle::Failed))
            .await
            .map_err(|_| AppError::internal("Counter lifecycle channel closed"))?;

        match current {
            Lifecycle::Ready => Ok(()),
            _ => Err(AppError::service_unavailable(format!(
                "Counter '{}' is unavailable",
                self.name
            ))),
        }
    }

    /// Register a connection and queue the current snapshot as its first
    /// frame.
    ///
    /// Waits for hydration. The classification is kept for in-band
    /// increments and may be absent.
    pub async fn on_connect(&self, classification: Option<Classification>) -> AppResult<Connection> {
        self.start().await?;

        let (handle, outbound) =
            ConnectionHandle::channel(classification, self.outbound_buffer_size);

        let state = self.state.lock().await;
        let snapshot = serialize_outbound(&OutboundMessage::Snapshot(state.payload(self.mode)))?;
        if !self.registry.add(handle.clone(), snapshot) {
            return Err(AppError::internal("Connection closed before its snapshot was queued"));
        }
        drop(state);

        Ok(Connection { handle, outbound })
    }

    /// Apply one increment and broadcast the changed values.
    ///
    /// Invalid input is rejected before any state changes.
    pub async fn on_increment(&self, input: Option<&Classification>) -> AppResult<IncrementOutcome> {
        self.start().await?;

        let keys = match self.aggregator.resolve(input) {
            Ok(keys) => keys,
            Err(e) => {
                self.metrics.increment_rejected();
                debug!(counter = %self.name, error = %e, "Increment rejected");
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;
        let updated = state.increment(&keys);
        let frame = serialize_outbound(&OutboundMessage::Update(self.update_payload(&updated)))?;
        let report = self.registry.broadcast(&frame);
        self.scheduler.mark_dirty(&updated).await;
        drop(state);

        self.metrics.increment_applied();
        debug!(
            counter = %self.name,
            keys = updated.len(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Increment applied"
        );

        Ok(IncrementOutcome {
            updated,
            delivered: report.delivered,
        })
    }

    /// Handle an inbound frame from a connection.
    ///
    /// Every frame counts as one increment with the connection's own
    /// classification. A rejection is reported to that connection only.
    pub async fn on_message(&self, conn_id: &ConnectionId) -> AppResult<()> {
        let Some(handle) = self.registry.get(conn_id) else {
            return Err(AppError::not_found(format!("Connection {conn_id} is not registered")));
        };

        match self.on_increment(handle.classification.as_ref()).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let frame =
                    serialize_outbound(&OutboundMessage::error(e.kind.to_string(), &e.message))?;
                self.registry.send_to(conn_id, frame);
                Err(e)
            }
        }
    }

    /// Remove a connection. Safe to call more than once.
    pub fn disconnect(&self, conn_id: &ConnectionId) {
        self.registry.remove(conn_id);
    }

    /// Copy of the full state.
    pub async fn snapshot(&self) -> AppResult<CounterState> {
        self.start().await?;
        Ok(self.state.lock().await.clone())
    }

    /// Close every connection and stop persistence.
    ///
    /// With `flush_on_shutdown` set, dirty keys are written first.
    pub async fn shutdown(&self) -> AppResult<FlushReport> {
        self.registry.close_all();
        let report = self.scheduler.shutdown(self.flush_on_shutdown).await?;
        info!(counter = %self.name, written = report.written, "Counter shut down");
        Ok(report)
    }

    fn update_payload(&self, updated: &BTreeMap<String, u64>) -> CountsPayload {
        match self.mode {
            CounterMode::Scalar => {
                CountsPayload::Scalar(updated.get(SCALAR_KEY).copied().unwrap_or_default())
            }
            CounterMode::Hierarchical => CountsPayload::Keys(updated.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::memory::MemoryStore;

    fn hierarchical(depth: usize) -> CounterConfig {
        CounterConfig {
            mode: CounterMode::Hierarchical,
            depth,
            ..CounterConfig::default()
        }
    }

    fn scalar() -> CounterConfig {
        CounterConfig {
            mode: CounterMode::Scalar,
            ..CounterConfig::default()
        }
    }

    fn actor(config: &CounterConfig, store: &MemoryStore) -> Arc<CounterActor> {
        CounterActor::new(
            "main",
            config,
            &RealtimeConfig::default(),
            Arc::new(store.clone()),
            Arc::new(RealtimeMetrics::new()),
        )
    }

    fn de01() -> Classification {
        Classification::new("DE", vec![0, 1]).unwrap()
    }

    #[tokio::test]
    async fn test_empty_store_hydrates_to_zero() {
        let store = MemoryStore::new();
        let actor = actor(&scalar(), &store);
        actor.start().await.unwrap();

        assert_eq!(actor.lifecycle(), Lifecycle::Ready);
        let mut conn = actor.on_connect(None).await.unwrap();
        assert_eq!(conn.outbound.recv().await.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_snapshot_then_updates_on_join() {
        let store = MemoryStore::new();
        let actor = actor(&hierarchical(2), &store);

        actor.on_increment(Some(&de01())).await.unwrap();
        let mut conn = actor.on_connect(Some(de01())).await.unwrap();
        actor.on_increment(Some(&de01())).await.unwrap();

        assert_eq!(
            conn.outbound.recv().await.as_deref(),
            Some(r#"{"DE":1,"DE.0":1,"DE.0.1":1}"#)
        );
        assert_eq!(
            conn.outbound.recv().await.as_deref(),
            Some(r#"{"DE":2,"DE.0":2,"DE.0.1":2}"#)
        );
    }

    #[tokio::test]
    async fn test_repeated_classification_rolls_up() {
        let store = MemoryStore::new();
        let actor = actor(&hierarchical(2), &store);

        actor.on_increment(Some(&de01())).await.unwrap();
        let outcome = actor.on_increment(Some(&de01())).await.unwrap();
        assert_eq!(outcome.updated["DE"], 2);

        let snapshot = actor.snapshot().await.unwrap();
        assert_eq!(snapshot.get("DE.0.1"), 2);
        assert_eq!(snapshot.root_total(), 2);
        assert!(snapshot.rollup_violations().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_leaves_state_untouched() {
        let store = MemoryStore::new();
        let actor = actor(&hierarchical(2), &store);

        let err = actor.on_increment(None).await.unwrap_err();
        assert!(err.is_invalid_input());
        let short = Classification::new("DE", vec![1]).unwrap();
        assert!(actor.on_increment(Some(&short)).await.unwrap_err().is_invalid_input());

        assert!(actor.snapshot().await.unwrap().is_empty());
        assert_eq!(actor.scheduler().dirty_len().await, 0);
    }

    #[tokio::test]
    async fn test_rejection_goes_to_sender_only() {
        let store = MemoryStore::new();
        let actor = actor(&hierarchical(2), &store);
        let mut anonymous = actor.on_connect(None).await.unwrap();
        let mut other = actor.on_connect(Some(de01())).await.unwrap();
        anonymous.outbound.recv().await.unwrap();
        other.outbound.recv().await.unwrap();

        let err = actor.on_message(&anonymous.handle.id).await.unwrap_err();
        assert!(err.is_invalid_input());

        let frame = anonymous.outbound.recv().await.unwrap();
        assert!(frame.contains(r#""error":"INVALID_INPUT""#));
        assert!(other.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_serialized() {
        let store = MemoryStore::new();
        let actor = actor(&scalar(), &store);

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let actor = actor.clone();
                tokio::spawn(async move { actor.on_increment(None).await })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        assert_eq!(actor.snapshot().await.unwrap().get(SCALAR_KEY), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mixed_classifications_keep_rollup() {
        let store = MemoryStore::new();
        let actor = actor(&hierarchical(3), &store);
        let regions = ["DE", "FR", "US"];

        let tasks: Vec<_> = (0..300usize)
            .map(|i| {
                let actor = actor.clone();
                let region = regions[i % regions.len()];
                let bits: Vec<u8> = (0..3).map(|b| ((i >> b) & 1) as u8).collect();
                tokio::spawn(async move {
                    let classification = Classification::new(region, bits)?;
                    actor.on_increment(Some(&classification)).await
                })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let snapshot = actor.snapshot().await.unwrap();
        assert_eq!(snapshot.root_total(), 300);
        assert!(snapshot.rollup_violations().is_empty());
        for region in regions {
            assert_eq!(snapshot.get(region), 100);
        }
    }

    #[tokio::test]
    async fn test_updates_arrive_in_increment_order() {
        let store = MemoryStore::new();
        let actor = actor(&scalar(), &store);
        let mut conn = actor.on_connect(None).await.unwrap();

        for _ in 0..5 {
            actor.on_increment(None).await.unwrap();
        }

        let frames: Vec<String> = (0..6).filter_map(|_| conn.outbound.try_recv().ok()).collect();
        assert_eq!(frames, vec!["0", "1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_failed_connection_does_not_block_others() {
        let store = MemoryStore::new();
        let actor = actor(&scalar(), &store);
        let mut a = actor.on_connect(None).await.unwrap();
        let b = actor.on_connect(None).await.unwrap();
        let mut c = actor.on_connect(None).await.unwrap();
        let b_id = b.handle.id;
        drop(b);

        let outcome = actor.on_increment(None).await.unwrap();
        assert_eq!(outcome.delivered, 2);
        for conn in [&mut a, &mut c] {
            assert_eq!(conn.outbound.recv().await.as_deref(), Some("0"));
            assert_eq!(conn.outbound.recv().await.as_deref(), Some("1"));
        }
        assert!(!actor.registry().contains(&b_id));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let store = MemoryStore::new();
        let actor = actor(&scalar(), &store);
        let conn = actor.on_connect(None).await.unwrap();

        actor.disconnect(&conn.handle.id);
        actor.disconnect(&conn.handle.id);
        assert!(actor.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_increments_wait_for_hydration() {
        let store = MemoryStore::with_entries([("count", 41)]);
        store.set_offline(true);
        let actor = actor(&scalar(), &store);

        let starter = tokio::spawn({
            let actor = actor.clone();
            async move { actor.start().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(actor.lifecycle(), Lifecycle::Hydrating);

        let waiter = tokio::spawn({
            let actor = actor.clone();
            async move { actor.on_increment(None).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        store.set_offline(false);
        starter.await.unwrap().unwrap();
        let outcome = waiter.await.unwrap().unwrap();
        assert_eq!(outcome.updated[SCALAR_KEY], 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hydration_failure_refuses_requests() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let config = CounterConfig {
            hydrate_max_attempts: 3,
            ..scalar()
        };
        let actor = actor(&config, &store);

        let err = actor.start().await.unwrap_err();
        assert_eq!(err.kind, tally_core::error::ErrorKind::ServiceUnavailable);
        assert_eq!(actor.lifecycle(), Lifecycle::Failed);
        assert!(actor.on_connect(None).await.is_err());
        assert!(actor.on_increment(None).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_persistence() {
        let store = MemoryStore::new();
        let actor = actor(&scalar(), &store);

        actor.on_increment(None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(store.get(SCALAR_KEY).await.unwrap(), None);

        // Due exactly at the flush delay
        tokio::time::sleep(Duration::from_millis(1)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.get(SCALAR_KEY).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let store = MemoryStore::new();
        let first = actor(&hierarchical(2), &store);
        first.on_increment(Some(&de01())).await.unwrap();
        first.on_increment(Some(&de01())).await.unwrap();
        first.shutdown().await.unwrap();

        let second = actor(&hierarchical(2), &store);
        let mut conn = second.on_connect(None).await.unwrap();
        assert_eq!(
            conn.outbound.recv().await.as_deref(),
            Some(r#"{"DE":2,"DE.0":2,"DE.0.1":2}"#)
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections() {
        let store = MemoryStore::new();
        let actor = actor(&scalar(), &store);
        let conn = actor.on_connect(None).await.unwrap();

        actor.shutdown().await.unwrap();
        assert!(conn.handle.is_closed());
        assert!(actor.registry().is_empty());
    }
}
