//! Durable key → count store used for write-behind persistence and hydration.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for durable counter backends (in-memory, local file, Redis).
///
/// A store holds the counts of exactly one counter instance; namespacing
/// between instances is the provider's concern at construction time.
/// Every failure is reported as an [`ErrorKind::Storage`] error.
///
/// [`ErrorKind::Storage`]: crate::error::ErrorKind::Storage
#[async_trait]
pub trait CounterStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "memory", "file").
    fn provider_type(&self) -> &str;

    /// Get the persisted count for a key.
    async fn get(&self, key: &str) -> AppResult<Option<u64>>;

    /// Persist the count for a key, replacing any earlier value.
    async fn put(&self, key: &str, value: u64) -> AppResult<()>;

    /// Read every persisted key. An empty store yields an empty map.
    async fn list(&self) -> AppResult<BTreeMap<String, u64>>;

    /// Persist a batch of counts.
    ///
    /// The default writes entries one at a time and stops at the first
    /// failure; providers with a native batch write override it.
    async fn put_many(&self, entries: &[(String, u64)]) -> AppResult<()> {
        for (key, value) in entries {
            self.put(key, *value).await?;
        }
        Ok(())
    }

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
