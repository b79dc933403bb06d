//! Login rate limiting using governor and `tower_governor`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use thiserror::Error;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::config::RateLimitConfig;

/// Key extractor that prefers proxy headers and falls back to the peer
/// address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        // First hop of X-Forwarded-For
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// The configured limits cannot be expressed as a token bucket.
#[derive(Debug, Error)]
#[error("invalid rate limit: {max_requests} requests per {window_secs}s")]
pub struct RateLimitError {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Seconds between replenished requests so that `max_requests` fit in the
/// window. Never below one.
fn replenish_interval(config: &RateLimitConfig) -> u64 {
    let max = u64::from(config.max_requests.max(1));
    config.window.as_secs().div_ceil(max).max(1)
}

/// Rate limiter for the login endpoint: a burst of `max_requests`, refilled
/// across the window.
///
/// # Errors
///
/// Returns `RateLimitError` if the limits are zero.
pub fn login_rate_limiter(config: &RateLimitConfig) -> Result<RateLimiterLayer, RateLimitError> {
    let governor = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_interval(config))
        .burst_size(config.max_requests)
        .finish()
        .ok_or(RateLimitError {
            max_requests: config.max_requests,
            window_secs: config.window.as_secs(),
        })?;
    Ok(GovernorLayer::new(Arc::new(governor)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn limits(window: u64, max: u32) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_secs(window),
            max_requests: max,
        }
    }

    #[test]
    fn test_replenish_interval() {
        assert_eq!(replenish_interval(&limits(60, 10)), 6);
        assert_eq!(replenish_interval(&limits(60, 7)), 9);
        assert_eq!(replenish_interval(&limits(1, 100)), 1);
    }

    #[test]
    fn test_zero_burst_rejected() {
        assert!(login_rate_limiter(&limits(60, 0)).is_err());
        assert!(login_rate_limiter(&limits(60, 10)).is_ok());
    }

    #[test]
    fn test_key_prefers_forwarded_header() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));

        let key = ClientIpKeyExtractor.extract(&req).ok();
        assert_eq!(key, "203.0.113.7".parse().ok());
    }

    #[test]
    fn test_key_falls_back_to_peer() {
        let mut req = Request::new(());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 4], 9000))));
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).ok(),
            Some(IpAddr::from([192, 168, 1, 4]))
        );

        assert!(ClientIpKeyExtractor.extract(&Request::new(())).is_err());
    }
}
