//! Rate limiting for authentication endpoints.
//!
//! Uses keyed token buckets with per-IP tracking to slow down credential
//! stuffing and refresh-token probing.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

use crate::auth::client_ip;

/// Per-IP rate limiter for endpoint-specific limiting.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login/register (10 attempts per 15 minutes)
    pub auth: Arc<IpLimiter>,
    /// Per-IP limiter for token refresh (5 attempts per hour)
    pub refresh: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Create rate limiters with the default quotas.
    pub fn new() -> Self {
        // 10 per 15 minutes: one replenished every 90 seconds, burst of 10.
        let auth_quota = Quota::with_period(Duration::from_secs(90))
            .expect("non-zero period")
            .allow_burst(NonZeroU32::new(10).expect("non-zero burst"));

        // 5 per hour: one replenished every 12 minutes, burst of 5.
        let refresh_quota = Quota::with_period(Duration::from_secs(720))
            .expect("non-zero period")
            .allow_burst(NonZeroU32::new(5).expect("non-zero burst"));

        Self {
            auth: Arc::new(RateLimiter::keyed(auth_quota)),
            refresh: Arc::new(RateLimiter::keyed(refresh_quota)),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn too_many_requests(message: &'static str) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "status": "error",
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

/// Key requests by client IP, with a shared bucket for requests whose IP
/// cannot be determined.
fn limiter_key(request: &Request) -> String {
    client_ip(request.headers(), request.extensions()).unwrap_or_else(|| "unknown".to_string())
}

/// Middleware for rate limiting login and registration.
pub async fn rate_limit_auth(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = limiter_key(&request);
    match config.auth.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => too_many_requests(
            "Too many authentication attempts from this IP, please try again after 15 minutes",
        ),
    }
}

/// Middleware for rate limiting token refresh.
pub async fn rate_limit_refresh(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = limiter_key(&request);
    match config.refresh.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => too_many_requests(
            "Too many refresh token attempts from this IP, please try again after an hour",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_quota_allows_five_then_blocks() {
        let config = RateLimitConfig::new();
        let ip = "203.0.113.7".to_string();

        for _ in 0..5 {
            assert!(config.refresh.check_key(&ip).is_ok());
        }
        assert!(config.refresh.check_key(&ip).is_err());

        // A different IP has its own bucket
        assert!(config.refresh.check_key(&"203.0.113.8".to_string()).is_ok());
    }

    #[test]
    fn test_auth_quota_allows_ten_then_blocks() {
        let config = RateLimitConfig::new();
        let ip = "203.0.113.7".to_string();

        for _ in 0..10 {
            assert!(config.auth.check_key(&ip).is_ok());
        }
        assert!(config.auth.check_key(&ip).is_err());
    }
}
