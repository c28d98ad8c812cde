//! # Redis Store
//!
//! `CacheStore` over a `redis::aio::ConnectionManager`. The manager
//! reconnects on its own; each call clones it (cheap, shared multiplexed
//! connection) because `AsyncCommands` needs `&mut self`.
//!
//! Timeouts are applied by the synchronizer, not here.

use std::collections::BTreeMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::CacheError;
use crate::store::CacheStore;

/// Redis-backed derived-record store.
#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore").finish_non_exhaustive()
    }
}

impl RedisCacheStore {
    /// Open a managed connection to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Backend` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| CacheError::backend("connect", redis_url, e))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::backend("connect", redis_url, e))?;
        tracing::info!("connected to redis");
        Ok(Self { manager })
    }

    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

fn map_err(op: &'static str, key: &str, e: redis::RedisError) -> CacheError {
    if e.kind() == redis::ErrorKind::TypeError || e.code() == Some("WRONGTYPE") {
        CacheError::WrongType {
            key: key.to_string(),
        }
    } else {
        CacheError::backend(op, key, e)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| map_err("get", key, e))
    }

    #[tracing::instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| map_err("set", key, e))
    }

    #[tracing::instrument(skip(self))]
    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| map_err("del", key, e))
    }

    #[tracing::instrument(skip(self, value))]
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.hset::<_, _, _, ()>(key, field, value)
            .await
            .map_err(|e| map_err("hset", key, e))
    }

    #[tracing::instrument(skip(self, fields))]
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> Result<(), CacheError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        conn.hset_multiple::<_, _, _, ()>(key, fields)
            .await
            .map_err(|e| map_err("hset", key, e))
    }

    #[tracing::instrument(skip(self))]
    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>, CacheError> {
        let mut conn = self.manager.clone();
        conn.hgetall::<_, BTreeMap<String, String>>(key)
            .await
            .map_err(|e| map_err("hgetall", key, e))
    }

    #[tracing::instrument(skip(self))]
    async fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.hdel::<_, _, ()>(key, field)
            .await
            .map_err(|e| map_err("hdel", key, e))
    }
}
