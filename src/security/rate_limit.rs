//! Per-client limit on message submissions.
//!
//! Each client keeps the instants of its recent accepted POSTs. Instants older
//! than the window are dropped on every check; when the remaining count has
//! reached the cap the request is refused, otherwise it is recorded.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Sliding-window limiter keyed by client address.
pub struct RateLimiter {
    hits: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
    path_prefix: String,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, path_prefix: impl Into<String>) -> Self {
        Self {
            hits: DashMap::new(),
            max_requests,
            window,
            path_prefix: path_prefix.into(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            config.path_prefix.clone(),
        )
    }

    /// Only message submissions are counted.
    pub fn applies_to(&self, method: &Method, path: &str) -> bool {
        method == Method::POST && path.starts_with(&self.path_prefix)
    }

    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Record a request from `key` at `now`; returns false when it must be refused.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        // The entry guard holds the shard lock, so prune + count + push is atomic per key.
        let mut hits = self.hits.entry(key.to_owned()).or_default();
        while let Some(oldest) = hits.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Forget clients whose every recorded request has left the window.
    pub fn sweep(&self, now: Instant) {
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}

/// First `X-Forwarded-For` hop when present, else the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.applies_to(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    if limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited();
        (
            StatusCode::FORBIDDEN,
            format!(
                "Message limit exceeded ({} messages per {}).",
                limiter.max_requests(),
                describe(limiter.window())
            ),
        )
            .into_response()
    }
}

fn describe(window: Duration) -> String {
    match window.as_secs() {
        60 => "minute".to_string(),
        3600 => "hour".to_string(),
        secs => format!("{secs} seconds"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn limiter() -> RateLimiter {
        RateLimiter::new(5, Duration::from_secs(60), "/api/messages")
    }

    #[test]
    fn test_sixth_request_in_window_is_blocked() {
        let limiter = limiter();
        let start = Instant::now();

        for i in 0..5 {
            assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(i)), "request {}", i + 1);
        }
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(10)));
        // Refused requests are not recorded.
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(59)));
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter();
        let start = Instant::now();

        for i in 0..5 {
            assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(i * 10)));
        }
        // The first hit (t=0) expires at t=60.
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(59)));
        assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(60)));
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(61)));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at("10.0.0.1", now));
        }
        assert!(!limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.2", now));
    }

    #[test]
    fn test_applies_only_to_message_posts() {
        let limiter = limiter();
        assert!(limiter.applies_to(&Method::POST, "/api/messages"));
        assert!(limiter.applies_to(&Method::POST, "/api/messages/"));
        assert!(!limiter.applies_to(&Method::GET, "/api/messages"));
        assert!(!limiter.applies_to(&Method::POST, "/api/conversations"));
    }

    #[test]
    fn test_sweep_drops_idle_clients() {
        let limiter = limiter();
        let start = Instant::now();
        limiter.check_at("10.0.0.1", start);
        limiter.check_at("10.0.0.2", start + Duration::from_secs(30));

        limiter.sweep(start + Duration::from_secs(61));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_client_key_prefers_forwarded_for() {
        let peer: SocketAddr = "192.168.1.9:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, Some(peer)), "192.168.1.9");
        assert_eq!(client_key(&headers, None), "unknown");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn test_concurrent_checks_never_over_admit() {
        let limiter = Arc::new(limiter());
        let now = Instant::now();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.check_at("10.0.0.1", now))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(admitted, 5);
    }
}
