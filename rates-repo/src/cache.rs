//! In-process rate cache with per-entry expiry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use rates_types::{CacheError, Clock, RateCache, RateMap, SystemClock};

/// Default upper bound on stored entries before expired ones are swept.
const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: RateMap,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe rate cache keyed by string, backed by a `DashMap`.
///
/// Entries are removed lazily on read once expired, and swept in bulk when
/// the map reaches its capacity.
pub struct InMemoryRateCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl InMemoryRateCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a cache that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry whose expiry has passed.
    pub fn evict_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }
}

impl Default for InMemoryRateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateCache for InMemoryRateCache {
    async fn get(&self, key: &str) -> Result<Option<RateMap>, CacheError> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                debug!(key, "Cache hit");
                return Ok(Some(entry.payload.clone()));
            }
            debug!(key, "Cache entry expired");
            drop(entry);
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }

        debug!(key, "Cache miss");
        Ok(None)
    }

    async fn set(&self, key: &str, rates: &RateMap, ttl: Duration) -> Result<(), CacheError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Payload(format!("ttl out of range: {}", e)))?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or_else(|| CacheError::Payload("ttl overflows expiry timestamp".to_string()))?;

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.evict_expired();
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                payload: rates.clone(),
                expires_at,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Mutex;

    const THIRTY_DAYS: u64 = 2_592_000;

    /// Clock that only moves when told to.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(
                    DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
                        .unwrap()
                        .with_timezone(&Utc),
                ),
            })
        }

        fn advance(&self, secs: i64) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn rates(pairs: &[(&str, &str)]) -> RateMap {
        pairs
            .iter()
            .map(|(c, r)| (c.to_string(), Decimal::from_str(r).unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn test_entry_served_until_ttl_elapses() {
        let clock = ManualClock::new();
        let cache = InMemoryRateCache::with_clock(clock.clone());
        let payload = rates(&[("EUR", "0.92")]);

        cache
            .set(
                "exchange_rates:USD",
                &payload,
                Duration::from_secs(THIRTY_DAYS),
            )
            .await
            .unwrap();

        clock.advance(THIRTY_DAYS as i64 - 1);
        assert_eq!(
            cache.get("exchange_rates:USD").await.unwrap(),
            Some(payload)
        );

        clock.advance(2);
        assert_eq!(cache.get("exchange_rates:USD").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_replaces_entry_but_is_never_served() {
        let clock = ManualClock::new();
        let cache = InMemoryRateCache::with_clock(clock.clone());

        cache
            .set("k", &rates(&[("EUR", "0.90")]), Duration::from_secs(10))
            .await
            .unwrap();
        cache
            .set("k", &rates(&[("EUR", "0.91")]), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites_and_restarts_expiry() {
        let clock = ManualClock::new();
        let cache = InMemoryRateCache::with_clock(clock.clone());

        cache
            .set("k", &rates(&[("EUR", "0.90")]), Duration::from_secs(10))
            .await
            .unwrap();
        clock.advance(8);
        cache
            .set("k", &rates(&[("EUR", "0.95")]), Duration::from_secs(10))
            .await
            .unwrap();
        clock.advance(8);

        assert_eq!(
            cache.get("k").await.unwrap(),
            Some(rates(&[("EUR", "0.95")]))
        );
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_case_sensitive() {
        let cache = InMemoryRateCache::new();
        cache
            .set(
                "exchange_rates:USD",
                &rates(&[("EUR", "0.92")]),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(cache.get("exchange_rates:usd").await.unwrap().is_none());
        assert!(cache.get("exchange_rates:USD").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_full_cache_sweeps_expired_entries() {
        let clock = ManualClock::new();
        let cache = InMemoryRateCache::with_clock(clock.clone()).with_capacity(2);

        cache
            .set("a", &rates(&[("EUR", "1")]), Duration::from_secs(5))
            .await
            .unwrap();
        cache
            .set("b", &rates(&[("EUR", "1")]), Duration::from_secs(50))
            .await
            .unwrap();
        clock.advance(10);
        cache
            .set("c", &rates(&[("EUR", "1")]), Duration::from_secs(50))
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("b").await.unwrap().is_some());
        assert!(cache.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_served() {
        let cache = InMemoryRateCache::with_clock(ManualClock::new());
        cache
            .set("k", &rates(&[("EUR", "1")]), Duration::ZERO)
            .await
            .unwrap();

        assert!(cache.get("k").await.unwrap().is_none());
    }
}
