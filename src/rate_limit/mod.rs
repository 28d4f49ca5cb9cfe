// Admission control
//
// Fixed-window request counting keyed by client IP. The decision is taken
// before any other stage of the order pipeline runs.

pub mod store;

pub use store::{InMemoryRateLimitStore, RateLimitStore, RedisRateLimitStore};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub success: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Epoch milliseconds at which the current window closes
    pub reset: i64,
}

impl RateLimitDecision {
    /// Write the `X-RateLimit-*` headers describing this decision
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        let pairs = [
            ("x-ratelimit-limit", self.limit.to_string()),
            ("x-ratelimit-remaining", self.remaining.to_string()),
            ("x-ratelimit-reset", self.reset.to_string()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
    }
}

/// Per-client fixed-window rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    prefix: &'static str,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, prefix: &'static str, config: RateLimitConfig) -> Self {
        Self {
            store,
            prefix,
            limit: config.max_requests,
            window: Duration::from_secs(config.window_secs.max(1)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Count one request for `client_key` in the current window
    pub async fn check(&self, client_key: &str) -> RateLimitDecision {
        self.check_at(client_key, chrono::Utc::now().timestamp_millis()).await
    }

    /// Same as [`RateLimiter::check`] with an explicit clock reading
    pub async fn check_at(&self, client_key: &str, now_ms: i64) -> RateLimitDecision {
        let window_ms = self.window.as_millis() as i64;
        let window_index = now_ms.div_euclid(window_ms);
        let reset = (window_index + 1) * window_ms;
        let key = self.bucket_key(client_key, window_index);

        match self.store.increment(&key, self.window).await {
            Ok(count) => RateLimitDecision {
                success: count <= self.limit,
                limit: self.limit,
                remaining: self.limit.saturating_sub(count),
                reset,
            },
            Err(e) => {
                // Fail open: a broken counter store must not take ordering down.
                tracing::error!(
                    backend = self.store.backend_name(),
                    "Rate limit store unavailable, admitting request: {}",
                    e
                );
                RateLimitDecision {
                    success: true,
                    limit: self.limit,
                    remaining: self.limit,
                    reset,
                }
            }
        }
    }

    fn bucket_key(&self, client_key: &str, window_index: i64) -> String {
        let digest = Sha256::digest(client_key.as_bytes());
        format!("ratelimit:{}:{:x}:{}", self.prefix, digest, window_index)
    }
}

/// Extract the client address used as rate limit key
///
/// First `X-Forwarded-For` entry (set by the edge proxy), then `X-Real-IP`,
/// then the socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let ip = real_ip.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}
