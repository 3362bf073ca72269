//! Background rate synchronizer.
//!
//! Pulls every configured provider once per run and persists whatever came
//! back in a single store transaction. A failing provider is skipped; a
//! failing store write fails the attempt, and the whole run is retried a
//! bounded number of times.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use rates_types::domain::validate_currency_code;
use rates_types::{Clock, RateGateway, RateRepository, RepoError, SyncBatch, SystemClock};

/// One upstream rate source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub name: String,
    pub url: String,
    pub base_currency: String,
}

impl ProviderConfig {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        base_currency: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            base_currency: base_currency.into(),
        }
    }
}

/// The five Thai bank feeds, all quoted against THB.
pub fn default_providers() -> Vec<ProviderConfig> {
    [
        ("SCB", "https://api.scb.co.th/exchange-rates"),
        ("KBANK", "https://api.kbank.co.th/exchange-rates"),
        ("BOT", "https://api.bot.or.th/exchange-rates"),
        ("BBL", "https://api.bbl.co.th/exchange-rates"),
        ("TMB", "https://api.tmbbank.com/exchange-rates"),
    ]
    .into_iter()
    .map(|(name, url)| ProviderConfig::new(name, url, "THB"))
    .collect()
}

/// Synchronizer settings. Provider order matters: for a pair published by
/// several providers in one run, the later provider sets the current rate.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub providers: Vec<ProviderConfig>,
    /// Total attempts per run, including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(60),
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Providers whose rates were persisted, in configuration order.
    pub persisted: Vec<String>,
    /// Providers skipped because their fetch failed.
    pub failed_providers: Vec<String>,
    /// Observations written (each is one history insert plus one upsert).
    pub rows_written: usize,
    /// Attempts the run took.
    pub attempts: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Sync run failed after {attempts} attempt(s): {last_error}")]
    RunFailed {
        attempts: u32,
        #[source]
        last_error: RepoError,
    },
}

/// Last known synchronizer state, published after every run.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    /// No run has finished yet.
    Pending,
    Succeeded {
        finished_at: DateTime<Utc>,
        rows_written: usize,
        failed_providers: Vec<String>,
        attempts: u32,
    },
    Failed {
        finished_at: DateTime<Utc>,
        attempts: u32,
        error: String,
    },
}

/// Periodic job pulling provider rates into the durable store.
///
/// Never touches the ephemeral cache.
pub struct RateSynchronizer<R: RateRepository> {
    repo: Arc<R>,
    gateway: Arc<dyn RateGateway>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    status: watch::Sender<SyncStatus>,
}

impl<R: RateRepository> RateSynchronizer<R> {
    pub fn new(repo: Arc<R>, gateway: Arc<dyn RateGateway>, config: SyncConfig) -> Self {
        let (status, _) = watch::channel(SyncStatus::Pending);
        Self {
            repo,
            gateway,
            clock: Arc::new(SystemClock),
            config,
            status,
        }
    }

    /// Replaces the clock used to date history rows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receiver that always holds the latest run status.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// One attempt: fetch every provider, then persist in one transaction.
    ///
    /// Provider failures are logged and skipped, as is a provider whose table
    /// carries a malformed currency code. Only a store failure is an error.
    pub async fn run_once(&self) -> Result<SyncOutcome, RepoError> {
        let mut batch = SyncBatch::new(self.clock.now().date_naive());
        let mut persisted = Vec::new();
        let mut failed_providers = Vec::new();

        for provider in &self.config.providers {
            match self.gateway.fetch_rates(&provider.url).await {
                Ok(rates) => {
                    if let Some(bad) = rates
                        .keys()
                        .find(|code| validate_currency_code("currency", code).is_err())
                    {
                        warn!(
                            provider = %provider.name,
                            currency = %bad,
                            "Provider returned an unusable currency code, skipping"
                        );
                        failed_providers.push(provider.name.clone());
                        continue;
                    }
                    info!(
                        provider = %provider.name,
                        currencies = rates.len(),
                        "Fetched provider rates"
                    );
                    batch.extend_from_rates(&provider.base_currency, &rates);
                    persisted.push(provider.name.clone());
                }
                Err(e) => {
                    warn!(provider = %provider.name, error = %e, "Provider fetch failed, skipping");
                    failed_providers.push(provider.name.clone());
                }
            }
        }

        let rows_written = if batch.is_empty() {
            0
        } else {
            self.repo.apply_sync_batch(&batch).await?
        };

        Ok(SyncOutcome {
            persisted,
            failed_providers,
            rows_written,
            attempts: 1,
        })
    }

    /// One run with bounded whole-run retry.
    #[tracing::instrument(skip(self), fields(providers = self.config.providers.len()))]
    pub async fn run(&self) -> Result<SyncOutcome, SyncError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.run_once().await {
                Ok(mut outcome) => {
                    outcome.attempts = attempt;
                    if outcome.persisted.is_empty() {
                        warn!(
                            failed = ?outcome.failed_providers,
                            "Sync run completed with no provider data"
                        );
                    } else {
                        info!(
                            rows = outcome.rows_written,
                            failed = ?outcome.failed_providers,
                            attempt,
                            "Sync run completed"
                        );
                    }
                    self.status.send_replace(SyncStatus::Succeeded {
                        finished_at: self.clock.now(),
                        rows_written: outcome.rows_written,
                        failed_providers: outcome.failed_providers.clone(),
                        attempts: attempt,
                    });
                    return Ok(outcome);
                }
                Err(e) if attempt >= max_attempts => {
                    error!(attempts = attempt, error = %e, "Sync run failed, giving up until next interval");
                    self.status.send_replace(SyncStatus::Failed {
                        finished_at: self.clock.now(),
                        attempts: attempt,
                        error: e.to_string(),
                    });
                    return Err(SyncError::RunFailed {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        retry_in_secs = self.config.retry_delay.as_secs(),
                        error = %e,
                        "Sync attempt failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    /// Runs immediately, then once per `interval`, forever.
    ///
    /// A failed run never ends the loop.
    pub async fn run_forever(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            // Already logged and published.
            let _ = self.run().await;
        }
    }
}
