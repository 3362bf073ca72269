//! Fixed-table gateway for development and testing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;

use rates_types::{GatewayError, RateGateway, RateMap};

/// Answers from an in-memory table keyed by URL.
///
/// Unknown URLs answer `404`. Every call is counted so that callers can
/// assert how often "upstream" was reached.
#[derive(Default)]
pub struct FixedRateGateway {
    responses: Mutex<HashMap<String, Result<RateMap, u16>>>,
    calls: AtomicUsize,
}

impl FixedRateGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table of cross rates for every base in `usd_values`.
    ///
    /// `usd_values` gives the value of one unit of each currency in USD; the
    /// rate from A to B is `value(A) / value(B)`. Each base is served at
    /// `url_template` with `{base}` replaced by its code.
    pub fn cross_rates(url_template: &str, usd_values: &[(&str, Decimal)]) -> Self {
        let gateway = Self::new();
        for (base, base_value) in usd_values {
            let rates: RateMap = usd_values
                .iter()
                .filter(|(_, value)| !value.is_zero())
                .filter_map(|(code, value)| {
                    base_value
                        .checked_div(*value)
                        .map(|rate| (code.to_string(), rate.normalize()))
                })
                .collect();
            gateway.set_rates(&url_template.replace("{base}", base), rates);
        }
        gateway
    }

    /// Serves `rates` at `url`.
    pub fn with_rates(self, url: &str, rates: RateMap) -> Self {
        self.set_rates(url, rates);
        self
    }

    /// Answers `url` with a non-200 `status`.
    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set_status(url, status);
        self
    }

    pub fn set_rates(&self, url: &str, rates: RateMap) {
        self.table().insert(url.to_string(), Ok(rates));
    }

    pub fn set_status(&self, url: &str, status: u16) {
        self.table().insert(url.to_string(), Err(status));
    }

    /// Number of `fetch_rates` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Result<RateMap, u16>>> {
        // A poisoned table only means a panicking test thread; the data is still usable.
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RateGateway for FixedRateGateway {
    async fn fetch_rates(&self, url: &str) -> Result<RateMap, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.table().get(url) {
            Some(Ok(rates)) => Ok(rates.clone()),
            Some(Err(status)) => Err(GatewayError::Status { status: *status }),
            None => Err(GatewayError::Status { status: 404 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_cross_rates() {
        let gateway = FixedRateGateway::cross_rates(
            "http://fixed/latest/{base}",
            &[("USD", dec("1")), ("EUR", dec("1.25")), ("INR", dec("0.0125"))],
        );

        let usd = gateway.fetch_rates("http://fixed/latest/USD").await.unwrap();
        assert_eq!(usd["USD"], dec("1"));
        assert_eq!(usd["EUR"], dec("0.8"));
        assert_eq!(usd["INR"], dec("80"));

        let eur = gateway.fetch_rates("http://fixed/latest/EUR").await.unwrap();
        assert_eq!(eur["INR"], dec("100"));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_status_and_unknown_url() {
        let gateway = FixedRateGateway::new().with_status("http://bot", 500);

        assert!(matches!(
            gateway.fetch_rates("http://bot").await,
            Err(GatewayError::Status { status: 500 })
        ));
        assert!(matches!(
            gateway.fetch_rates("http://nowhere").await,
            Err(GatewayError::Status { status: 404 })
        ));
    }
}
