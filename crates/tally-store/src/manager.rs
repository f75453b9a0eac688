//! Store manager that dispatches to the configured provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use tally_core::config::store::StoreConfig;
use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;

/// Store manager that wraps the configured store provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner store provider.
    inner: Arc<dyn CounterStore>,
}

impl StoreManager {
    /// Create a store for the named counter instance from configuration.
    pub async fn new(config: &StoreConfig, instance: &str) -> AppResult<Self> {
        Self::build(config, instance, false).await
    }

    /// Open the store for inspection. Writes through a read-only file
    /// store fail, and opening one never touches the filesystem.
    pub async fn open_read_only(config: &StoreConfig, instance: &str) -> AppResult<Self> {
        Self::build(config, instance, true).await
    }

    #[cfg_attr(not(feature = "file"), allow(unused_variables))]
    async fn build(config: &StoreConfig, instance: &str, read_only: bool) -> AppResult<Self> {
        let inner: Arc<dyn CounterStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!(instance, "Initializing Redis counter store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisStore::new(client, instance))
            }
            #[cfg(feature = "file")]
            "file" => {
                let path = instance_path(&config.file.path, instance);
                info!(instance, path = %path, read_only, "Initializing file counter store");
                if read_only {
                    Arc::new(crate::file::FileStore::open_read_only(&path).await?)
                } else {
                    Arc::new(crate::file::FileStore::open(&path).await?)
                }
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(instance, "Initializing in-memory counter store");
                Arc::new(crate::memory::MemoryStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, file, redis"
                )));
            }
        };

        Ok(Self { inner })
    }
}

/// The configured path belongs to the default instance; other instances
/// get a sibling file suffixed with their name.
fn instance_path(path: &str, instance: &str) -> String {
    if instance == "main" {
        return path.to_string();
    }
    match path.strip_suffix(".json") {
        Some(stem) => format!("{stem}.{instance}.json"),
        None => format!("{path}.{instance}"),
    }
}

#[async_trait]
impl CounterStore for StoreManager {
    fn provider_type(&self) -> &str {
        self.inner.provider_type()
    }

    async fn get(&self, key: &str) -> AppResult<Option<u64>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: u64) -> AppResult<()> {
        self.inner.put(key, value).await
    }

    async fn put_many(&self, entries: &[(String, u64)]) -> AppResult<()> {
        self.inner.put_many(entries).await
    }

    async fn list(&self) -> AppResult<BTreeMap<String, u64>> {
        self.inner.list().await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
