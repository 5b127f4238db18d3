//! Per-IP sliding window limiter for payment initiation.
//!
//! Each client IP keeps the instants of its recent requests. A request is
//! admitted when fewer than `max_requests` of them fall inside the window.
//! State is process-local; several instances behind a balancer each count
//! separately.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

/// Message returned with a 429.
pub const RATE_LIMIT_MESSAGE: &str = "Too many payment requests, please try again later.";

/// Sliding window request counter keyed by client IP.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window`.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `key` now. Returns whether it is admitted.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Record a request from `key` at `now`. Returns whether it is admitted.
    ///
    /// Rejected requests are not recorded.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = match self.hits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entries = hits.entry(key.to_string()).or_default();

        while entries
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            entries.pop_front();
        }

        if entries.len() >= self.max_requests {
            return false;
        }
        entries.push_back(now);
        true
    }
}

/// Client IP for limiting purposes.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` entry wins.
fn client_ip(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

/// Middleware rejecting requests over the limit with a 429.
pub async fn limit_payment_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(&request, state.config.trust_forwarded_for);

    if !state.rate_limiter.check(&ip) {
        tracing::warn!(client_ip = %ip, "Payment initiation rate limit exceeded");
        return Err(ApiError::TooManyRequests(RATE_LIMIT_MESSAGE.into()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleventh_request_is_rejected_per_ip() {
        let limiter = RateLimiter::new(10, Duration::from_secs(900));
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_at("10.0.0.1", now));
        }
        assert!(!limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.2", now));
    }

    #[test]
    fn old_requests_slide_out_of_the_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("10.0.0.1", start));
        assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(30)));
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(59)));
        // First request expires; the one at +30s still counts.
        assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(60)));
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(61)));
    }
}
