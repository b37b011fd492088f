//! Login rate limiting using governor and `tower_governor`.
//!
//! The admin console sits behind a single reverse proxy, so the client IP is
//! taken with `tower_governor`'s [`SmartIpKeyExtractor`]: `X-Forwarded-For`,
//! `X-Real-IP` or `Forwarded`, falling back to the peer address.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

/// Rate limiter layer type for the login route.
pub type LoginRateLimiterLayer =
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the login rate limiter: one attempt every 12 seconds, burst of 3.
///
/// # Panics
///
/// This function will not panic. `per_second(12)` and `burst_size(3)` are
/// valid positive values, which `GovernorConfigBuilder` always accepts.
#[must_use]
pub fn login_rate_limiter() -> LoginRateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(12)
        .burst_size(3)
        .finish()
        .expect("rate limiter config with per_second(12) and burst_size(3) is valid");
    GovernorLayer::new(Arc::new(config))
}
