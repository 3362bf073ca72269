//! HTTP gateway backed by `reqwest`.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use rates_types::{GatewayError, RateGateway, RateMap};

/// Wire shape of a provider answer. Extra fields are ignored.
#[derive(Deserialize)]
struct RatesBody {
    rates: BTreeMap<String, serde_json::Number>,
}

/// Parses a provider body into a [`RateMap`].
///
/// Numbers are converted through their decimal text so that `0.92` becomes
/// exactly `0.92` rather than the nearest binary float.
pub fn parse_rates_body(body: &[u8]) -> Result<RateMap, GatewayError> {
    let parsed: RatesBody =
        serde_json::from_slice(body).map_err(|e| GatewayError::Malformed(e.to_string()))?;

    parsed
        .rates
        .into_iter()
        .map(|(currency, number)| {
            let text = number.to_string();
            let rate = Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|e| {
                    GatewayError::Malformed(format!("rate for {}: {} ({})", currency, text, e))
                })?;
            Ok((currency, rate))
        })
        .collect()
}

/// Calls upstream providers over HTTP.
///
/// Every request carries the client-wide timeout, so one slow provider cannot
/// hold a caller indefinitely.
#[derive(Clone)]
pub struct HttpRateGateway {
    client: Client,
}

impl HttpRateGateway {
    /// Creates a gateway whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("rates-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}

#[async_trait]
impl RateGateway for HttpRateGateway {
    async fn fetch_rates(&self, url: &str) -> Result<RateMap, GatewayError> {
        debug!(url, "Fetching upstream rates");

        let response = self.client.get(url).send().await.map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GatewayError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport_error)?;
        parse_rates_body(&body)
    }
}
