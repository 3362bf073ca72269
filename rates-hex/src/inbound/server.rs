//! HTTP Server configuration and startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use rates_types::RateRepository;

use super::auth::{require_admin, require_user};
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::{RateService, SyncStatus};

/// Per-client request quotas, per hour.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub per_hour: u32,
    /// Quota for `/admin/*` routes, counted separately.
    pub admin_per_hour: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_hour: 100,
            admin_per_hour: 50,
        }
    }
}

/// HTTP Server for the exchange rate API.
pub struct HttpServer<R: RateRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
    admin_rate_limiter: Arc<RateLimiterState>,
}

impl<R: RateRepository> HttpServer<R> {
    /// Creates a new HTTP server with the default quotas.
    pub fn new(service: RateService<R>, sync_status: watch::Receiver<SyncStatus>) -> Self {
        Self::with_rate_limits(service, sync_status, RateLimits::default())
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limits(
        service: RateService<R>,
        sync_status: watch::Receiver<SyncStatus>,
        limits: RateLimits,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                service,
                sync_status,
            }),
            rate_limiter: Arc::new(RateLimiterState::per_hour(limits.per_hour)),
            admin_rate_limiter: Arc::new(RateLimiterState::per_hour(limits.admin_per_hour)),
        }
    }

    /// Builds the Axum router with all routes.
    ///
    /// `/health` and the OpenAPI document are not rate limited.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let user_routes = Router::new()
            .route("/convert", post(handlers::convert::<R>))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_user::<R>,
            ));

        let public_routes = Router::new()
            .route("/", get(handlers::home))
            .route("/exchange-rates", get(handlers::exchange_rates::<R>))
            .route(
                "/supported-currencies",
                get(handlers::supported_currencies::<R>),
            )
            .route("/historical-rates", get(handlers::historical_rates::<R>))
            .merge(user_routes)
            .route_layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ));

        let admin_routes = Router::new()
            .route("/admin/update-rates", post(handlers::update_rates::<R>))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_admin::<R>,
            ))
            .route_layer(middleware::from_fn_with_state(
                self.admin_rate_limiter.clone(),
                rate_limit_middleware,
            ));

        Router::new()
            .route("/health", get(handlers::health::<R>))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .merge(public_routes)
            .merge(admin_routes)
            .fallback(handlers::not_found)
            .layer(metrics)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
