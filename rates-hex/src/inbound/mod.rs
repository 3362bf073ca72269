//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
pub(crate) mod handlers;
mod rate_limit;
mod server;

pub use auth::API_KEY_HEADER;
pub use handlers::{ApiError, AppState, ErrorResponse};
pub use rate_limit::RateLimiterState;
pub use server::{HttpServer, RateLimits};
