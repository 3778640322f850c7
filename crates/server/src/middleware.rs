//! Rate limiting middleware for the trigger endpoint using governor and
//! `tower_governor`.
//!
//! A synchronization run is expensive (one listing chain plus up to two
//! requests per order), so repeated form submissions must not stack
//! concurrent runs. The store has a single run queue, so the limit is
//! global rather than per-IP.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::key_extractor::GlobalKeyExtractor;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};

/// Rate limiter layer type for Axum.
pub type TriggerRateLimiterLayer =
    GovernorLayer<GlobalKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the trigger rate limiter: ~1 run every 10 seconds, burst of 2.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid
/// positive integers (`per_second(10)` and `burst_size(2)`), which are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn trigger_rate_limiter() -> TriggerRateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(GlobalKeyExtractor)
        .per_second(10) // Replenish 1 token every 10 seconds
        .burst_size(2)
        .finish()
        .expect("rate limiter config with per_second(10) and burst_size(2) is valid");
    GovernorLayer::new(Arc::new(config))
}
