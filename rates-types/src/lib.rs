//! # Rates Types
//!
//! Domain types and port traits for the exchange rate service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (rate records, API keys, currencies)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    ApiKeyRecord, HistoricalRateRecord, RateMap, RateObservation, RateRecord, Role,
    SupportedCurrency, SyncBatch,
};
pub use dto::*;
pub use error::{AppError, CacheError, DomainError, GatewayError, RepoError};
pub use ports::{Clock, RateCache, RateGateway, RateRepository, SystemClock, rates_cache_key};
