//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use rates_types::domain::{HistoricalRateRecord, Role, SupportedCurrency};
use rates_types::dto::{
    BaseCurrencyQuery, ConvertRequest, ConvertResponse, MessageResponse, UpdateRatesRequest,
    UpdateRatesResponse,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::SyncStatus;
use crate::inbound::ErrorResponse;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Welcome message
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Welcome message", body = MessageResponse)
    )
)]
async fn home() {}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy; `sync` is the last synchronizer outcome", body = inline(serde_json::Value),
            example = json!({"status": "healthy", "sync": {"state": "pending"}}))
    )
)]
async fn health() {}

/// Live exchange rates for a base currency
#[utoipa::path(
    get,
    path = "/exchange-rates",
    tag = "rates",
    params(BaseCurrencyQuery),
    responses(
        (status = 200, description = "Currency code to rate", body = inline(serde_json::Value),
            example = json!({"EUR": "0.92", "THB": "36.5"})),
        (status = 400, description = "Invalid base currency", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded"),
        (status = 502, description = "Upstream rates unavailable", body = ErrorResponse)
    )
)]
async fn exchange_rates() {}

/// Convert an amount at the live rate
#[utoipa::path(
    post,
    path = "/convert",
    tag = "rates",
    request_body = ConvertRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Converted amount", body = ConvertResponse),
        (status = 400, description = "Missing field or unsupported currency", body = ErrorResponse),
        (status = 401, description = "API key missing", body = ErrorResponse),
        (status = 403, description = "API key invalid or not a User key", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded"),
        (status = 502, description = "Upstream rates unavailable", body = ErrorResponse)
    )
)]
async fn convert() {}

/// List supported currencies
#[utoipa::path(
    get,
    path = "/supported-currencies",
    tag = "reference",
    responses(
        (status = 200, description = "Supported currencies", body = Vec<SupportedCurrency>),
        (status = 429, description = "Rate limit exceeded")
    )
)]
async fn supported_currencies() {}

/// Last 30 recorded rates for a base currency, newest first
#[utoipa::path(
    get,
    path = "/historical-rates",
    tag = "reference",
    params(BaseCurrencyQuery),
    responses(
        (status = 200, description = "History rows", body = Vec<HistoricalRateRecord>),
        (status = 400, description = "Invalid base currency", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded")
    )
)]
async fn historical_rates() {}

/// Overwrite current rates for a base currency
#[utoipa::path(
    post,
    path = "/admin/update-rates",
    tag = "admin",
    request_body = UpdateRatesRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Rates updated", body = UpdateRatesResponse),
        (status = 400, description = "Missing base currency or rates", body = ErrorResponse),
        (status = 401, description = "API key missing", body = ErrorResponse),
        (status = 403, description = "API key invalid or not an Admin key", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded")
    )
)]
async fn update_rates() {}

/// OpenAPI documentation for the exchange rate API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Currency Exchange API",
        version = "1.0.0",
        description = "Live and historical currency exchange rates.\n\n## Authentication\n\n`/convert` needs a `User` key and `/admin/update-rates` an `Admin` key, sent in the `X-API-KEY` header:\n\n```\nX-API-KEY: your_api_key_here\n```",
        license(name = "MIT"),
    ),
    paths(
        home,
        health,
        exchange_rates,
        convert,
        supported_currencies,
        historical_rates,
        update_rates,
    ),
    components(
        schemas(
            ConvertRequest,
            ConvertResponse,
            UpdateRatesRequest,
            UpdateRatesResponse,
            MessageResponse,
            SupportedCurrency,
            HistoricalRateRecord,
            Role,
            SyncStatus,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rates", description = "Live rates and conversion"),
        (name = "reference", description = "Supported currencies and rate history"),
        (name = "admin", description = "Rate maintenance"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for the `X-API-KEY` header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-KEY"))),
            );
        }
    }
}
