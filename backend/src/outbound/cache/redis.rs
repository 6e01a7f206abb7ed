//! Redis-backed cache store using a `bb8` connection pool.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::{AsyncCommands, RedisError};
use tracing::debug;

use crate::domain::ports::{CacheKey, CacheStore, CacheStoreError};

/// Failure to build the Redis connection pool.
#[derive(Debug, thiserror::Error)]
#[error("redis cache unavailable: {0}")]
pub struct RedisCacheStoreError(#[from] RedisError);

/// Cache store shared across instances through Redis.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool<RedisConnectionManager>,
    ttl: Duration,
}

impl RedisCacheStore {
    /// Connect to `url` and keep entries for `ttl`.
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, RedisCacheStoreError> {
        let manager = RedisConnectionManager::new(url)?;
        let pool = Pool::builder().build(manager).await?;
        Ok(Self { pool, ttl })
    }

    fn backend_error(error: impl std::fmt::Display) -> CacheStoreError {
        CacheStoreError::backend(error.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        let mut conn = self.pool.get().await.map_err(Self::backend_error)?;
        conn.get::<_, Option<String>>(key.as_str())
            .await
            .map_err(Self::backend_error)
    }

    async fn put(&self, key: &CacheKey, value: String) -> Result<(), CacheStoreError> {
        let mut conn = self.pool.get().await.map_err(Self::backend_error)?;
        conn.set_ex::<_, _, ()>(key.as_str(), value, self.ttl.as_secs().max(1))
            .await
            .map_err(Self::backend_error)?;
        debug!(key = %key, "cache entry written");
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheStoreError> {
        let mut conn = self.pool.get().await.map_err(Self::backend_error)?;
        conn.del::<_, ()>(key.as_str())
            .await
            .map_err(Self::backend_error)
    }
}
