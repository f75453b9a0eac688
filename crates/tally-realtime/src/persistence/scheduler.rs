//! Debounced write-behind scheduler.
//!
//! The first key marked dirty after a flush starts a timer of
//! `flush_delay`; later marks inside that window join the same batch
//! without pushing the timer back. When the timer fires every dirty entry
//! is written in one `put_many` call. A failed write keeps the entries
//! dirty and arms a new timer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;

use crate::metrics::RealtimeMetrics;

use super::dirty::DirtySet;

/// Result of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Entries written to the store.
    pub written: usize,
    /// Entries still dirty afterwards (changed while the write ran).
    pub remaining: usize,
}

#[derive(Debug, Default)]
struct SchedulerState {
    dirty: DirtySet,
    /// A flush timer is armed.
    pending: bool,
}

#[derive(Debug)]
struct Shared {
    store: Arc<dyn CounterStore>,
    delay: Duration,
    state: Mutex<SchedulerState>,
    /// Held for the duration of a store write so flushes never overlap.
    flush_lock: Mutex<()>,
    metrics: Arc<RealtimeMetrics>,
    shutdown: CancellationToken,
}

/// Write-behind persistence for one counter instance.
#[derive(Debug, Clone)]
pub struct WriteBehindScheduler {
    shared: Arc<Shared>,
}

impl WriteBehindScheduler {
    /// Create a scheduler writing to `store` at most once per `delay`.
    pub fn new(store: Arc<dyn CounterStore>, delay: Duration, metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                delay,
                state: Mutex::new(SchedulerState::default()),
                flush_lock: Mutex::new(()),
                metrics,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Read every persisted entry (hydration).
    pub async fn load_all(&self) -> AppResult<BTreeMap<String, u64>> {
        self.shared.store.list().await
    }

    /// Record new values and arm the flush timer if it is not armed yet.
    pub async fn mark_dirty(&self, entries: &BTreeMap<String, u64>) {
        if entries.is_empty() {
            return;
        }
        let mut state = self.shared.state.lock().await;
        for (key, value) in entries {
            state.dirty.mark(key.clone(), *value);
        }
        if !state.pending {
            self.arm(&mut state);
        }
    }

    /// Write every dirty entry now.
    ///
    /// On failure the entries stay dirty and a retry timer is armed.
    pub async fn flush(&self) -> AppResult<FlushReport> {
        let _guard = self.shared.flush_lock.lock().await;

        let batch = {
            let mut state = self.shared.state.lock().await;
            state.pending = false;
            state.dirty.snapshot()
        };
        if batch.is_empty() {
            return Ok(FlushReport::default());
        }

        match self.shared.store.put_many(&batch).await {
            Ok(()) => {
                let mut state = self.shared.state.lock().await;
                state.dirty.clear_flushed(&batch);
                self.shared.metrics.flush_succeeded(batch.len() as u64);
                let report = FlushReport {
                    written: batch.len(),
                    remaining: state.dirty.len(),
                };
                debug!(written = report.written, remaining = report.remaining, "Flushed dirty keys");
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, keys = batch.len(), "Flush failed, keeping keys dirty");
                self.shared.metrics.flush_failed();
                let mut state = self.shared.state.lock().await;
                if !state.pending && !state.dirty.is_empty() {
                    self.arm(&mut state);
                }
                Err(e)
            }
        }
    }

    /// Stop the timer and, if `final_flush`, write what is still dirty.
    pub async fn shutdown(&self, final_flush: bool) -> AppResult<FlushReport> {
        self.shared.shutdown.cancel();
        if !final_flush {
            return Ok(FlushReport {
                written: 0,
                remaining: self.dirty_len().await,
            });
        }
        let report = self.flush().await?;
        info!(written = report.written, "Final flush complete");
        Ok(report)
    }

    /// Number of entries waiting to be written.
    pub async fn dirty_len(&self) -> usize {
        self.shared.state.lock().await.dirty.len()
    }

    /// Whether a flush timer is armed.
    pub async fn is_pending(&self) -> bool {
        self.shared.state.lock().await.pending
    }

    /// Provider name of the underlying store.
    pub fn provider_type(&self) -> &str {
        self.shared.store.provider_type()
    }

    /// Health of the underlying store.
    pub async fn store_health(&self) -> AppResult<bool> {
        self.shared.store.health_check().await
    }

    fn arm(&self, state: &mut SchedulerState) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        state.pending = true;

        let scheduler = self.clone();
        let delay = self.shared.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = scheduler.shared.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // Errors are logged and retried inside flush.
                    let _ = scheduler.flush().await;
                }
            }
        });
    }
}
