//! # Rates Upstream
//!
//! Outbound adapters for the [`RateGateway`](rates_types::RateGateway) port.
//!
//! - [`HttpRateGateway`] calls real providers over HTTP with a bounded timeout.
//! - [`FixedRateGateway`] serves a hardcoded table, for development and tests.
//!
//! Both speak the same contract: a provider answers `GET url` with
//! `200 {"rates": {"EUR": 0.92, ...}}`; anything else is a gateway failure.

mod fixed;
mod http;

pub use fixed::FixedRateGateway;
pub use http::{HttpRateGateway, parse_rates_body};
