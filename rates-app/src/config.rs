//! Configuration loading from environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use rates_hex::inbound::RateLimits;
use rates_hex::service::{DEFAULT_CACHE_TTL, DEFAULT_LIVE_RATES_URL};
use rates_hex::synchronizer::default_providers;
use rates_hex::{ProviderConfig, ServiceConfig, SyncConfig};
use rates_repo::StoreOptions;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration. Built once at startup, then read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub live_rates_url: String,
    pub providers: Vec<ProviderConfig>,
    pub sync_interval: Duration,
    pub sync_max_attempts: u32,
    pub sync_retry_delay: Duration,
    pub upstream_timeout: Duration,
    pub cache_ttl: Duration,
    pub store: StoreOptions,
    pub rate_limits: RateLimits,
    pub otel_enabled: bool,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unset and empty values take defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let base_currency = var("SYNC_BASE_CURRENCY").unwrap_or_else(|| "THB".to_string());
        let providers = match var("RATE_PROVIDERS") {
            Some(list) => parse_providers(&list, &base_currency)?,
            None => default_providers()
                .into_iter()
                .map(|p| ProviderConfig {
                    base_currency: base_currency.clone(),
                    ..p
                })
                .collect(),
        };

        let sync_interval = secs_or(&var, "SYNC_INTERVAL_SECS", 3600)?;
        if sync_interval.is_zero() {
            anyhow::bail!("SYNC_INTERVAL_SECS must be greater than zero");
        }

        let store_defaults = StoreOptions::default();
        let limit_defaults = RateLimits::default();

        Ok(Self {
            port: parse_or(&var, "PORT", 3000)?,
            database_url,
            redis_url: var("REDIS_URL"),
            live_rates_url: var("LIVE_RATES_URL")
                .unwrap_or_else(|| DEFAULT_LIVE_RATES_URL.to_string()),
            providers,
            sync_interval,
            sync_max_attempts: parse_or(&var, "SYNC_MAX_ATTEMPTS", 3)?,
            sync_retry_delay: secs_or(&var, "SYNC_RETRY_DELAY_SECS", 60)?,
            upstream_timeout: secs_or(&var, "UPSTREAM_TIMEOUT_SECS", 10)?,
            cache_ttl: secs_or(&var, "CACHE_TTL_SECS", DEFAULT_CACHE_TTL.as_secs())?,
            store: StoreOptions {
                max_connections: parse_or(
                    &var,
                    "DB_MAX_CONNECTIONS",
                    store_defaults.max_connections,
                )?,
                acquire_timeout: secs_or(
                    &var,
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    store_defaults.acquire_timeout.as_secs(),
                )?,
                statement_timeout: secs_or(
                    &var,
                    "DB_STATEMENT_TIMEOUT_SECS",
                    store_defaults.statement_timeout.as_secs(),
                )?,
            },
            rate_limits: RateLimits {
                per_hour: parse_or(&var, "RATE_LIMIT_PER_HOUR", limit_defaults.per_hour)?,
                admin_per_hour: parse_or(
                    &var,
                    "ADMIN_RATE_LIMIT_PER_HOUR",
                    limit_defaults.admin_per_hour,
                )?,
            },
            otel_enabled: parse_or(&var, "OTEL_ENABLED", false)?,
            log_format: match var("LOG_FORMAT").as_deref() {
                None | Some("text") => LogFormat::Text,
                Some("json") => LogFormat::Json,
                Some(other) => anyhow::bail!("LOG_FORMAT must be `text` or `json`, got `{}`", other),
            },
        })
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            live_rates_url: self.live_rates_url.clone(),
            cache_ttl: self.cache_ttl,
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            providers: self.providers.clone(),
            max_attempts: self.sync_max_attempts,
            retry_delay: self.sync_retry_delay,
        }
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: `{}` ({})", key, raw, e)),
        None => Ok(default),
    }
}

fn secs_or<F>(var: &F, key: &str, default: u64) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(var, key, default).map(Duration::from_secs)
}

/// Parses `NAME=url,NAME=url`; every provider is quoted against `base_currency`.
fn parse_providers(list: &str, base_currency: &str) -> anyhow::Result<Vec<ProviderConfig>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry
                .split_once('=')
                .with_context(|| format!("RATE_PROVIDERS entry `{}` is not NAME=url", entry))?;
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || url.is_empty() {
                anyhow::bail!("RATE_PROVIDERS entry `{}` is not NAME=url", entry);
            }
            Ok(ProviderConfig::new(name, url, base_currency))
        })
        .collect()
}
