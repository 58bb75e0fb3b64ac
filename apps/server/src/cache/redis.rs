//! Redis cache backend over a `bb8` connection pool

use async_trait::async_trait;
use bb8_redis::{bb8::Pool, redis, RedisConnectionManager};
use std::time::Duration;

use super::CacheBackend;
use crate::config::CacheConfig;
use crate::{Error, Result};

#[derive(Clone)]
pub struct RedisCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisCache {
    /// Build the pool and check connectivity with a PING.
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())?;
        let pool = Pool::builder()
            .max_size(config.pool_max_size)
            .connection_timeout(config.timeout())
            .build(manager)
            .await?;

        let cache = Self { pool };
        cache.ping().await?;
        Ok(cache)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Cache(e.to_string()))?;
        let reply: String = redis::cmd("PING").query_async(&mut *conn).await?;
        tracing::debug!(reply = %reply, "Redis connection verified");
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Cache(e.to_string()))?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Cache(e.to_string()))?;
        let () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut *conn)
            .await?;
        Ok(())
    }
}
