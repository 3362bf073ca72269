//! Authentication middleware for API key and role checks.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use rates_types::{RateRepository, Role};

use super::handlers::{ApiError, AppState};

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Extracts the raw API key, if the header is present and valid UTF-8.
pub(crate) fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

/// Admits callers holding a `User` key.
pub async fn require_user<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    authorize(state, request, next, Role::User).await
}

/// Admits callers holding an `Admin` key.
pub async fn require_admin<R: RateRepository>(
    State(state): State<Arc<AppState<R>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    authorize(state, request, next, Role::Admin).await
}

/// Runs the access guard and stashes the key record in request extensions.
async fn authorize<R: RateRepository>(
    state: Arc<AppState<R>>,
    mut request: Request<Body>,
    next: Next,
    role: Role,
) -> Response {
    let credential = extract_api_key(request.headers()).map(str::to_owned);

    match state
        .service
        .guard()
        .authorize(credential.as_deref(), Some(role))
        .await
    {
        Ok(record) => {
            request.extensions_mut().insert(record);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(required = %role, error = %e, "Request rejected by access guard");
            ApiError(e).into_response()
        }
    }
}
