//! Key/value cache used for doctor lookups
//!
//! Values are JSON strings stored under `<entity>:id:<identifier>` keys with a
//! per-entry TTL and are never invalidated explicitly. The server uses Redis
//! through a `bb8` pool; the in-memory map is a test double with latency and
//! outage switches.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;

use crate::Result;

pub use memory::InMemoryCache;
pub use self::redis::RedisCache;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

pub fn cache_key(entity: &str, id: impl Display) -> String {
    format!("{entity}:id:{id}")
}

pub fn doctor_key(doctor_id: uuid::Uuid) -> String {
    cache_key("doctor", doctor_id)
}
