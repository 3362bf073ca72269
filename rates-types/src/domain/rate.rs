//! Exchange rate domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Currency code to rate, for a single base currency.
///
/// Ordered so that serialized payloads are stable.
pub type RateMap = BTreeMap<String, Decimal>;

/// The current known rate for a `(base_currency, currency)` pair.
///
/// There is at most one row per pair; writers always upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RateRecord {
    #[schema(example = "THB")]
    pub base_currency: String,
    #[schema(example = "USD")]
    pub currency: String,
    #[schema(value_type = f64, example = 0.0281)]
    pub rate: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// An immutable point-in-time observation of a rate.
///
/// One row per `(base_currency, currency, date)`; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoricalRateRecord {
    #[schema(example = "THB")]
    pub base_currency: String,
    #[schema(example = "USD")]
    pub currency: String,
    #[schema(value_type = f64, example = 0.0281)]
    pub rate: Decimal,
    #[schema(value_type = String, example = "2024-01-01")]
    pub date: NaiveDate,
}

/// A single `(base, currency, rate)` triple collected during a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateObservation {
    pub base_currency: String,
    pub currency: String,
    pub rate: Decimal,
}

/// Everything one synchronizer run persists, written in a single transaction.
///
/// Observations are applied in order: for a repeated pair the current rate
/// ends up with the last value while the day's history keeps the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncBatch {
    pub date: NaiveDate,
    pub observations: Vec<RateObservation>,
}

impl SyncBatch {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            observations: Vec::new(),
        }
    }

    /// Appends every rate a provider published for `base_currency`.
    pub fn extend_from_rates(&mut self, base_currency: &str, rates: &RateMap) {
        self.observations
            .extend(rates.iter().map(|(currency, rate)| RateObservation {
                base_currency: base_currency.to_string(),
                currency: currency.clone(),
                rate: *rate,
            }));
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
