//! Redis-backed rate cache.
//!
//! Payloads are stored as JSON objects with a server-side expiry (`PSETEX`),
//! so entries outlive the process and are shared across replicas. Writing
//! with a zero expiry removes the key.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::debug;

use rates_types::{CacheError, RateCache, RateMap};

/// Rate cache on a multiplexed, auto-reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisRateCache {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisRateCache {
    /// Connects to `redis_url`. Each later command is bounded by `op_timeout`.
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| CacheError::Backend(e.to_string()))?;
        let conn = tokio::time::timeout(op_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Backend("timed out connecting to redis".to_string()))?
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        Ok(Self { conn, op_timeout })
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheError::Backend("redis command timed out".to_string()))?
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

#[async_trait]
impl RateCache for RedisRateCache {
    async fn get(&self, key: &str) -> Result<Option<RateMap>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = self.bounded(conn.get(key)).await?;

        match raw {
            Some(json) => {
                debug!(key, "Cache hit");
                serde_json::from_str(&json)
                    .map(Some)
                    .map_err(|e| CacheError::Payload(e.to_string()))
            }
            None => {
                debug!(key, "Cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, rates: &RateMap, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        // A zero expiry means the entry is already stale.
        let Some(millis) = expiry_millis(ttl) else {
            return self.bounded(conn.del::<_, ()>(key)).await;
        };

        let json = serde_json::to_string(rates).map_err(|e| CacheError::Payload(e.to_string()))?;
        self.bounded(conn.pset_ex::<_, _, ()>(key, json, millis))
            .await
    }
}

/// `PSETEX` expiry for `ttl`, or `None` when it rounds down to nothing.
fn expiry_millis(ttl: Duration) -> Option<u64> {
    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    (millis > 0).then_some(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_has_no_expiry() {
        assert_eq!(expiry_millis(Duration::ZERO), None);
        assert_eq!(expiry_millis(Duration::from_micros(400)), None);
    }

    #[test]
    fn test_sub_second_ttl_is_kept_in_millis() {
        assert_eq!(expiry_millis(Duration::from_millis(500)), Some(500));
        assert_eq!(expiry_millis(Duration::from_secs(2_592_000)), Some(2_592_000_000));
    }
}
