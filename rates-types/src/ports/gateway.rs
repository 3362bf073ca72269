//! Upstream rate gateway port.
//!
//! Implementations can be HTTP clients, fixed tables, mocks, etc.

use crate::domain::RateMap;
use crate::error::GatewayError;

/// Port trait for upstream rate providers.
#[async_trait::async_trait]
pub trait RateGateway: Send + Sync + 'static {
    /// Fetches the `rates` mapping published at `url`.
    ///
    /// Any non-200 answer, transport failure, timeout or unparsable body is
    /// reported as a [`GatewayError`].
    async fn fetch_rates(&self, url: &str) -> Result<RateMap, GatewayError>;
}
