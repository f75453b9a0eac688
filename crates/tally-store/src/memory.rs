//! In-memory counter store backed by dashmap.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;

/// Process-local store. Cloning shares the same underlying map.
///
/// The store can be switched offline to exercise storage outages; while
/// offline every operation fails with a storage error.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Persisted counts.
    entries: Arc<DashMap<String, u64>>,
    /// Simulated outage flag.
    offline: Arc<AtomicBool>,
    /// Number of successful `put` calls (batch entries included).
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with counts.
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        let store = Self::new();
        for (key, value) in entries {
            store.entries.insert(key.into(), value);
        }
        store
    }

    /// Switch the simulated outage on or off.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Total number of key writes performed so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::storage("Memory store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> AppResult<Option<u64>> {
        self.ensure_online()?;
        Ok(self.entries.get(key).map(|entry| *entry.value()))
    }

    async fn put(&self, key: &str, value: u64) -> AppResult<()> {
        self.ensure_online()?;
        self.entries.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(key, value, "Stored count");
        Ok(())
    }

    async fn list(&self) -> AppResult<BTreeMap<String, u64>> {
        self.ensure_online()?;
        Ok(self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }
}
