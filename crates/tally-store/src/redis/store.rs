//! Redis-backed counter store: one hash per counter instance.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use tally_core::error::{AppError, ErrorKind};
use tally_core::result::AppResult;
use tally_core::traits::store::CounterStore;

use super::client::RedisClient;

/// Redis hash store. Field = counter key, value = count.
#[derive(Debug, Clone)]
pub struct RedisStore {
    /// Redis client.
    client: RedisClient,
    /// Fully prefixed hash key for this instance.
    hash_key: String,
}

impl RedisStore {
    /// Create a store for the named counter instance.
    pub fn new(client: RedisClient, instance: &str) -> Self {
        let hash_key = client.prefixed_key(instance);
        Self { client, hash_key }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Storage, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    fn provider_type(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> AppResult<Option<u64>> {
        let mut conn = self.client.conn_mut();
        conn.hget(&self.hash_key, key).await.map_err(Self::map_err)
    }

    async fn put(&self, key: &str, value: u64) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .hset(&self.hash_key, key, value)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn put_many(&self, entries: &[(String, u64)]) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .hset_multiple(&self.hash_key, entries)
            .await
            .map_err(Self::map_err)?;
        debug!(hash = %self.hash_key, count = entries.len(), "Wrote counts to Redis");
        Ok(())
    }

    async fn list(&self) -> AppResult<BTreeMap<String, u64>> {
        let mut conn = self.client.conn_mut();
        let all: HashMap<String, u64> = conn
            .hgetall(&self.hash_key)
            .await
            .map_err(Self::map_err)?;
        Ok(all.into_iter().collect())
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
