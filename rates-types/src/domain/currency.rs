//! Currency reference data.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

/// Longest currency code accepted as a base or target currency.
pub const MAX_CURRENCY_CODE_LEN: usize = 10;

/// A row of the `supported_currencies` reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SupportedCurrency {
    /// Currency code
    #[schema(example = "THB")]
    pub code: String,
    /// Display name
    #[schema(example = "Thai Baht")]
    pub name: String,
}

/// Checks that a caller-supplied currency code is safe to use as a cache key
/// segment and as an upstream URL path segment.
///
/// The code is not case-normalised: `usd` and `USD` are distinct keys.
pub fn validate_currency_code(field: &str, code: &str) -> Result<(), DomainError> {
    if code.is_empty() {
        return Err(DomainError::MissingField(field.to_string()));
    }
    if code.len() > MAX_CURRENCY_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DomainError::ValidationError(format!(
            "Invalid currency code for {}: {}",
            field, code
        )));
    }
    Ok(())
}
