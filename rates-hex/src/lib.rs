//! # Rates Hex
//!
//! Application layer and HTTP adapter for the exchange rate service.
//!
//! ## Architecture
//!
//! - `service` - Rate reader, conversion and admin updates (orchestrates ports)
//! - `guard` - API key and role check in front of mutating operations
//! - `synchronizer` - Periodic multi-provider pull into the durable store
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Services are generic over `R: RateRepository`; the gateway and cache are
//! injected as trait objects.

pub mod guard;
pub mod inbound;
pub mod openapi;
pub mod service;
pub mod synchronizer;

#[cfg(test)]
mod service_tests;

pub use guard::AccessGuard;
pub use service::{RateService, ServiceConfig};
pub use synchronizer::{
    ProviderConfig, RateSynchronizer, SyncConfig, SyncError, SyncOutcome, SyncStatus,
};
