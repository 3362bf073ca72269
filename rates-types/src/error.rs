//! Error types for the exchange rate service.

use crate::domain::Role;

/// Domain-level errors (caller input that violates business rules).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Corrupt row: {0}")]
    Decode(String),
}

/// Upstream gateway errors. Every way an upstream call can fail ends up here.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("Upstream timed out")]
    Timeout,

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Malformed upstream body: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// The HTTP status the upstream answered with, if it answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status } => Some(*status),
            GatewayError::Malformed(_) => Some(200),
            GatewayError::Timeout | GatewayError::Transport(_) => None,
        }
    }
}

/// Ephemeral cache errors. Never surfaced to API callers.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache payload error: {0}")]
    Payload(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("API Key is required")]
    MissingCredential,

    #[error("Invalid API Key")]
    InvalidCredential,

    #[error("Access denied for role: {actual}")]
    RoleMismatch { required: Role, actual: Role },

    #[error("Failed to fetch exchange rates")]
    UpstreamUnavailable { status: Option<u16> },

    #[error("Currency {0} not supported")]
    UnsupportedCurrency(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::UpstreamUnavailable {
            status: err.upstream_status(),
        }
    }
}
