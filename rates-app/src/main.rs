//! # Rates Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter and the rate cache
//! - Start the background rate synchronizer
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use rates_hex::{RateService, RateSynchronizer, inbound::HttpServer};
use rates_repo::{InMemoryRateCache, build_repo};
use rates_types::ports::{RateCache, RateGateway};
use rates_upstream::HttpRateGateway;

use config::{Config, LogFormat};

/// Bound on each Redis round trip before the cache is treated as unavailable.
#[cfg(feature = "redis")]
const REDIS_OP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("rates-service"), provider))
}

/// Redis when configured and reachable, otherwise the in-process cache.
async fn build_cache(config: &Config) -> Arc<dyn RateCache> {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        match rates_repo::RedisRateCache::connect(url, REDIS_OP_TIMEOUT).await {
            Ok(cache) => {
                tracing::info!("Using Redis rate cache");
                return Arc::new(cache);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, falling back to in-process cache")
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL is set but the `redis` feature is disabled; using in-process cache");
    }

    Arc::new(InMemoryRateCache::new())
}

/// Scheme part of a connection URL; credentials stay out of the logs.
fn database_kind(url: &str) -> &str {
    url.split(':').next().unwrap_or("unknown")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing subscriber, with OpenTelemetry export when enabled
    let otel = if config.otel_enabled {
        Some(init_tracer()?)
    } else {
        None
    };
    let telemetry = otel
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone()));

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rates_app=debug,rates_hex=debug".into()),
        )
        .with(telemetry)
        .init();

    tracing::info!("Starting rates server on port {}", config.port);
    tracing::info!("Using database: {}", database_kind(&config.database_url));

    // Build repository (handles connection and migration)
    let repo = Arc::new(build_repo(&config.database_url, &config.store).await?);
    let cache = build_cache(&config).await;
    let gateway: Arc<dyn RateGateway> = Arc::new(HttpRateGateway::new(config.upstream_timeout)?);

    // Background synchronizer; its status feeds /health
    let synchronizer = Arc::new(RateSynchronizer::new(
        repo.clone(),
        gateway.clone(),
        config.sync_config(),
    ));
    let sync_status = synchronizer.subscribe();
    let sync_interval = config.sync_interval;
    let sync_task = tokio::spawn({
        let synchronizer = synchronizer.clone();
        async move { synchronizer.run_forever(sync_interval).await }
    });

    // Create the rate service
    let service = RateService::new(repo, gateway, cache, config.service_config());

    // Create and run the HTTP server
    let server = HttpServer::with_rate_limits(service, sync_status, config.rate_limits);
    let addr = format!("0.0.0.0:{}", config.port);

    let result = server.run(&addr).await;

    sync_task.abort();

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Failed to flush traces");
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_kind_hides_credentials() {
        assert_eq!(database_kind("postgres://user:secret@db/rates"), "postgres");
        assert_eq!(database_kind("sqlite::memory:"), "sqlite");
    }
}
