//! Rate Application Service
//!
//! Orchestrates the read path (cache-aside over the live gateway), currency
//! conversion and admin rate updates through the ports.
//! Contains NO infrastructure logic - pure orchestration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use rates_types::domain::validate_currency_code;
use rates_types::{
    AppError, ConvertRequest, ConvertResponse, DomainError, HistoricalRateRecord, RateCache,
    RateGateway, RateMap, RateRepository, SupportedCurrency, UpdateRatesRequest,
    UpdateRatesResponse, rates_cache_key,
};

use crate::guard::AccessGuard;

/// Live rates endpoint used when none is configured; `{base}` is substituted.
pub const DEFAULT_LIVE_RATES_URL: &str = "https://open.er-api.com/v6/latest/{base}";

/// Thirty days.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2_592_000);

/// Number of history rows returned per base currency.
pub const HISTORY_LIMIT: i64 = 30;

/// Read-path settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Live rates URL template containing `{base}`.
    pub live_rates_url: String,
    /// Lifetime of a cached rate set.
    pub cache_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            live_rates_url: DEFAULT_LIVE_RATES_URL.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Application service for rate operations.
///
/// Generic over `R: RateRepository`; the gateway and cache are shared trait
/// objects so that the HTTP adapter and tests can swap them freely.
pub struct RateService<R: RateRepository> {
    repo: Arc<R>,
    gateway: Arc<dyn RateGateway>,
    cache: Arc<dyn RateCache>,
    guard: AccessGuard<R>,
    config: ServiceConfig,
}

impl<R: RateRepository> RateService<R> {
    pub fn new(
        repo: Arc<R>,
        gateway: Arc<dyn RateGateway>,
        cache: Arc<dyn RateCache>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            guard: AccessGuard::new(Arc::clone(&repo)),
            repo,
            gateway,
            cache,
            config,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn guard(&self) -> &AccessGuard<R> {
        &self.guard
    }

    fn live_url(&self, base: &str) -> String {
        self.config.live_rates_url.replace("{base}", base)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Read path
    // ─────────────────────────────────────────────────────────────────────────────

    /// Returns the rate set for `base`, from cache when fresh, else upstream.
    ///
    /// Only successful upstream answers are cached. Cache failures degrade to
    /// a miss on read and are logged on write.
    pub async fn get_rates(&self, base: &str) -> Result<RateMap, AppError> {
        validate_currency_code("base", base)?;
        let key = rates_cache_key(base);

        match self.cache.get(&key).await {
            Ok(Some(rates)) => return Ok(rates),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, treating as miss"),
        }

        let rates = self
            .gateway
            .fetch_rates(&self.live_url(base))
            .await
            .map_err(|e| {
                warn!(base, error = %e, "Live rates fetch failed");
                AppError::from(e)
            })?;

        if let Err(e) = self.cache.set(&key, &rates, self.config.cache_ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }

        debug!(base, currencies = rates.len(), "Live rates fetched");
        Ok(rates)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion
    // ─────────────────────────────────────────────────────────────────────────────

    /// Converts an amount at the live rate. Never reads or writes the cache.
    pub async fn convert(&self, req: ConvertRequest) -> Result<ConvertResponse, AppError> {
        let from = required_code("from_currency", req.from_currency)?;
        let to = required_code("to_currency", req.to_currency)?;
        let amount = req
            .amount
            .filter(|amount| !amount.is_zero())
            .ok_or_else(|| DomainError::MissingField("amount".into()))?;

        let rates = self.gateway.fetch_rates(&self.live_url(&from)).await?;

        let rate = rates
            .get(&to)
            .copied()
            .filter(|rate| !rate.is_zero())
            .ok_or_else(|| AppError::UnsupportedCurrency(to.clone()))?;

        let converted_amount = amount
            .checked_mul(rate)
            .ok_or_else(|| AppError::Validation("Amount is too large to convert".into()))?;

        Ok(ConvertResponse {
            converted_amount,
            rate,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────────

    /// Overwrites current rates for a base. History and cache are left alone.
    pub async fn update_rates(
        &self,
        req: UpdateRatesRequest,
    ) -> Result<UpdateRatesResponse, AppError> {
        let base = required_code("base_currency", req.base_currency)?;
        let rates = req
            .rates
            .filter(|rates| !rates.is_empty())
            .ok_or_else(|| DomainError::MissingField("rates".into()))?;

        for currency in rates.keys() {
            validate_currency_code("rates", currency)?;
        }

        let updated = self.repo.upsert_rates(&base, &rates).await?;

        Ok(UpdateRatesResponse {
            message: "Exchange rates updated successfully".into(),
            updated,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reference data
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn supported_currencies(&self) -> Result<Vec<SupportedCurrency>, AppError> {
        self.repo.supported_currencies().await.map_err(Into::into)
    }

    /// Most recent history rows for `base`, newest date first.
    pub async fn historical_rates(
        &self,
        base: &str,
    ) -> Result<Vec<HistoricalRateRecord>, AppError> {
        validate_currency_code("base", base)?;
        self.repo
            .historical_rates(base, HISTORY_LIMIT)
            .await
            .map_err(Into::into)
    }
}

/// Unwraps a required currency field; empty counts as absent.
fn required_code(field: &str, value: Option<String>) -> Result<String, DomainError> {
    let code = value
        .filter(|code| !code.is_empty())
        .ok_or_else(|| DomainError::MissingField(field.into()))?;
    validate_currency_code(field, &code)?;
    Ok(code)
}
