//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::sync::watch;
use utoipa::{OpenApi, ToSchema};

use rates_types::{
    AppError, BaseCurrencyQuery, ConvertRequest, MessageResponse, RateRepository,
    UpdateRatesRequest,
};

use crate::openapi::ApiDoc;
use crate::{RateService, SyncStatus};

/// Application state shared across handlers.
pub struct AppState<R: RateRepository> {
    pub service: RateService<R>,
    pub sync_status: watch::Receiver<SyncStatus>,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Currency ZZZ not supported")]
    pub error: String,
    #[schema(example = 400)]
    pub code: u16,
    /// Status the upstream answered with, for upstream failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: status.as_u16(),
            upstream_status: None,
        }
    }
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) | AppError::UnsupportedCurrency(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCredential => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredential | AppError::RoleMismatch { .. } => StatusCode::FORBIDDEN,
            AppError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.0.to_string();
        let body = match self.0 {
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage failure");
                ErrorResponse::new(status, "Internal server error")
            }
            AppError::UpstreamUnavailable {
                status: upstream_status,
            } => ErrorResponse {
                upstream_status,
                ..ErrorResponse::new(status, message)
            },
            _ => ErrorResponse::new(status, message),
        };

        (status, Json(body)).into_response()
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Welcome message.
pub async fn home() -> impl IntoResponse {
    Json(MessageResponse {
        message: "Welcome to Currency Exchange API".into(),
    })
}

/// Health check endpoint, with the last synchronizer outcome.
pub async fn health<R: RateRepository>(State(state): State<Arc<AppState<R>>>) -> impl IntoResponse {
    let sync = state.sync_status.borrow().clone();
    Json(serde_json::json!({ "status": "healthy", "sync": sync }))
}

/// Live rates for a base currency (cache-aside).
#[tracing::instrument(skip(state))]
pub async fn exchange_rates<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<BaseCurrencyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rates = state.service.get_rates(&query.base_or_default()).await?;
    Ok(Json(rates))
}

/// Convert an amount at the live rate.
#[tracing::instrument(skip_all)]
pub async fn convert<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(payload)?;
    tracing::debug!(from = ?req.from_currency, to = ?req.to_currency, "Converting");
    let result = state.service.convert(req).await?;
    Ok(Json(result))
}

/// List supported currencies.
#[tracing::instrument(skip(state))]
pub async fn supported_currencies<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let currencies = state.service.supported_currencies().await?;
    Ok(Json(currencies))
}

/// Most recent history rows for a base currency.
#[tracing::instrument(skip(state))]
pub async fn historical_rates<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<BaseCurrencyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state
        .service
        .historical_rates(&query.base_or_default())
        .await?;
    Ok(Json(history))
}

/// Overwrite current rates for a base currency.
#[tracing::instrument(skip_all)]
pub async fn update_rates<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<UpdateRatesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(payload)?;
    let resp = state.service.update_rates(req).await?;
    tracing::info!(updated = resp.updated, "Admin rate update applied");
    Ok(Json(resp))
}

/// OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// JSON 404 for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(StatusCode::NOT_FOUND, "Not found")),
    )
}
