//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! Request fields are optional at the serde level so that an absent field is
//! reported as a validation error with a useful message rather than a
//! generic JSON rejection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::RateMap;

// ─────────────────────────────────────────────────────────────────────────────
// Query DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Query string for endpoints keyed by base currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BaseCurrencyQuery {
    /// Base currency code; defaults to `USD`
    pub base: Option<String>,
}

impl BaseCurrencyQuery {
    /// The requested base, with `USD` for a missing or empty parameter.
    pub fn base_or_default(&self) -> String {
        match self.base.as_deref() {
            Some(base) if !base.is_empty() => base.to_string(),
            _ => "USD".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to convert an amount between two currencies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConvertRequest {
    #[schema(example = "USD")]
    pub from_currency: Option<String>,
    #[schema(example = "EUR")]
    pub to_currency: Option<String>,
    #[schema(value_type = Option<f64>, example = 100)]
    pub amount: Option<Decimal>,
}

/// Result of a conversion at the live rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConvertResponse {
    #[schema(value_type = f64, example = 92.0)]
    pub converted_amount: Decimal,
    #[schema(value_type = f64, example = 0.92)]
    pub rate: Decimal,
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to overwrite current rates for a base currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRatesRequest {
    #[schema(example = "THB")]
    pub base_currency: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub rates: Option<RateMap>,
}

/// Acknowledgement of an admin rate update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateRatesResponse {
    #[schema(example = "Exchange rates updated successfully")]
    pub message: String,
    /// Number of pairs written
    #[schema(example = 2)]
    pub updated: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Misc
// ─────────────────────────────────────────────────────────────────────────────

/// Plain message body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Welcome to Currency Exchange API")]
    pub message: String,
}
