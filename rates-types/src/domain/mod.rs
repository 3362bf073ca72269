//! Domain models for the exchange rate service.

pub mod api_key;
pub mod currency;
pub mod rate;

pub use api_key::{ApiKeyRecord, Role};
pub use currency::{SupportedCurrency, validate_currency_code};
pub use rate::{HistoricalRateRecord, RateMap, RateObservation, RateRecord, SyncBatch};
