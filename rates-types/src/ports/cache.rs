//! Ephemeral rate cache port.

use std::time::Duration;

use crate::domain::RateMap;
use crate::error::CacheError;

/// Builds the cache key for the live rates of `base_currency`.
///
/// The base is used as supplied, so keys are case-sensitive.
pub fn rates_cache_key(base_currency: &str) -> String {
    format!("exchange_rates:{}", base_currency)
}

/// Key-value cache of rate sets with per-entry expiry.
///
/// The cache is never authoritative; an entry must not be returned once its
/// time-to-live has elapsed.
#[async_trait::async_trait]
pub trait RateCache: Send + Sync + 'static {
    /// Returns the payload stored under `key` if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<RateMap>, CacheError>;

    /// Stores `rates` under `key`, replacing any previous entry, for `ttl`.
    async fn set(&self, key: &str, rates: &RateMap, ttl: Duration) -> Result<(), CacheError>;
}
