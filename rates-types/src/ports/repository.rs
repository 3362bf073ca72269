//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory mocks) implement this trait.

use crate::domain::{ApiKeyRecord, HistoricalRateRecord, RateMap, SupportedCurrency, SyncBatch};
use crate::error::RepoError;

/// The durable store port.
///
/// Every write is an upsert or an insert-if-absent, so replaying a write is
/// harmless and concurrent writers converge on the last value.
#[async_trait::async_trait]
pub trait RateRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────────

    /// Persists one synchronizer run in a single transaction.
    ///
    /// Each observation is appended to `historical_rates` under `batch.date`
    /// (ignored if that day already has a row for the pair) and upserted into
    /// `exchange_rates`. Returns the number of observations written.
    async fn apply_sync_batch(&self, batch: &SyncBatch) -> Result<usize, RepoError>;

    /// Upserts every `(base_currency, currency)` pair in a single transaction.
    /// History is left untouched.
    async fn upsert_rates(&self, base_currency: &str, rates: &RateMap)
    -> Result<usize, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists the newest `limit` historical rows for a base, by date descending.
    async fn historical_rates(
        &self,
        base_currency: &str,
        limit: i64,
    ) -> Result<Vec<HistoricalRateRecord>, RepoError>;

    /// Lists the supported currencies reference table.
    async fn supported_currencies(&self) -> Result<Vec<SupportedCurrency>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Reference data
    // ─────────────────────────────────────────────────────────────────────────────

    /// Looks up an API key by its raw value.
    async fn find_api_key(&self, key_value: &str) -> Result<Option<ApiKeyRecord>, RepoError>;
}
