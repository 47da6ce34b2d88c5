//! Per-tenant provider rate limiting ports and application service.
//!
//! Dispatches are admitted through a fixed one-minute window keyed by
//! `(tenant, provider adapter)`. The window protects third-party providers, so bursts at
//! minute boundaries are tolerated.

mod config;
mod ports;
mod service;

pub use config::RateLimitPolicy;
pub use ports::RateLimitRepository;
pub use service::RateLimitService;
