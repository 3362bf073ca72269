//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod cache;
mod clock;
mod gateway;
mod repository;

pub use cache::{RateCache, rates_cache_key};
pub use clock::{Clock, SystemClock};
pub use gateway::RateGateway;
pub use repository::RateRepository;
