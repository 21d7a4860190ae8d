//! Per-route, per-client rate limiting.
//!
//! Each route owns a [`Quota`] ("15 per 1 minute"). Requests are counted in
//! fixed windows keyed by route and client address. The client address is the
//! `CF-Connecting-IP` header when the server sits behind a trusted proxy, and
//! the TCP peer address otherwise.
//!
//! A rejected request gets 429 and never reaches its handler.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Header set by Cloudflare with the original client address.
pub const PROXY_CLIENT_IP_HEADER: &str = "cf-connecting-ip";

/// Requests allowed per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub requests: u32,
    pub period: Duration,
}

impl Quota {
    pub fn new(requests: u32, period: Duration) -> Self {
        Self { requests, period }
    }

    /// Human form used in 429 bodies, e.g. `15 per 1 minute`.
    pub fn describe(&self) -> String {
        let secs = self.period.as_secs();
        let (n, unit) = if secs >= 3600 && secs % 3600 == 0 {
            (secs / 3600, "hour")
        } else if secs >= 60 && secs % 60 == 0 {
            (secs / 60, "minute")
        } else {
            (secs, "second")
        };
        let plural = if n == 1 { "" } else { "s" };
        format!("{} per {} {}{}", self.requests, n, unit, plural)
    }
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct Window {
    started: Instant,
    period: Duration,
    count: u32,
}

/// Fixed-window counters shared by all routes.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<(&'static str, String), Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a request from `client` on `route`.
    pub fn check(&self, route: &'static str, client: &str, quota: Quota) -> Decision {
        self.check_at(route, client, quota, Instant::now())
    }

    pub fn check_at(&self, route: &'static str, client: &str, quota: Quota, now: Instant) -> Decision {
        let mut window = self
            .windows
            .entry((route, client.to_string()))
            .or_insert_with(|| Window {
                started: now,
                period: quota.period,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= quota.period {
            window.started = now;
            window.period = quota.period;
            window.count = 0;
        }

        if window.count >= quota.requests {
            let retry_after = quota
                .period
                .saturating_sub(now.saturating_duration_since(window.started));
            return Decision::Limited { retry_after };
        }

        window.count += 1;
        Decision::Allowed {
            remaining: quota.requests - window.count,
        }
    }

    /// Drops windows that have expired. Returns how many were removed.
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < w.period);
        before - self.windows.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Middleware state for one route.
#[derive(Clone)]
pub struct RouteGuard {
    pub route: &'static str,
    pub quota: Quota,
    pub limiter: Arc<RateLimiter>,
    pub trust_proxy_header: bool,
}

/// Resolves the rate-limit key for a request.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_header: bool) -> String {
    if trust_proxy_header {
        let forwarded = headers
            .get(PROXY_CLIENT_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rejects requests over the route's quota with 429.
pub async fn enforce(State(guard): State<RouteGuard>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer, guard.trust_proxy_header);

    match guard.limiter.check(guard.route, &client, guard.quota) {
        Decision::Allowed { remaining } => {
            debug!(route = guard.route, %client, remaining, "request within rate limit");
            next.run(req).await
        }
        Decision::Limited { retry_after } => {
            warn!(
                route = guard.route,
                %client,
                "rate limit exceeded ({})",
                guard.quota.describe()
            );
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, secs.max(1).to_string())],
                Json(json!({
                    "error": format!("Rate limit exceeded: {}", guard.quota.describe())
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn per_minute(n: u32) -> Quota {
        Quota::new(n, Duration::from_secs(60))
    }

    #[test]
    fn test_quota_describe() {
        assert_eq!(per_minute(15).describe(), "15 per 1 minute");
        assert_eq!(Quota::new(1, Duration::from_secs(2)).describe(), "1 per 2 seconds");
        assert_eq!(Quota::new(5, Duration::from_secs(3600)).describe(), "5 per 1 hour");
        assert_eq!(Quota::new(1, Duration::from_secs(1)).describe(), "1 per 1 second");
    }

    #[test]
    fn test_limit_within_window() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let quota = per_minute(3);

        assert_eq!(
            limiter.check_at("cpu", "10.0.0.1", quota, now),
            Decision::Allowed { remaining: 2 }
        );
        limiter.check_at("cpu", "10.0.0.1", quota, now);
        limiter.check_at("cpu", "10.0.0.1", quota, now);

        let later = now + Duration::from_secs(20);
        assert_eq!(
            limiter.check_at("cpu", "10.0.0.1", quota, later),
            Decision::Limited {
                retry_after: Duration::from_secs(40)
            }
        );
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let quota = Quota::new(1, Duration::from_secs(1));

        assert!(matches!(
            limiter.check_at("all", "a", quota, now),
            Decision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("all", "a", quota, now + Duration::from_millis(500)),
            Decision::Limited { .. }
        ));
        assert!(matches!(
            limiter.check_at("all", "a", quota, now + Duration::from_secs(1)),
            Decision::Allowed { .. }
        ));
    }

    #[test]
    fn test_clients_and_routes_are_independent() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let quota = per_minute(1);

        limiter.check_at("time", "a", quota, now);
        assert!(matches!(
            limiter.check_at("time", "b", quota, now),
            Decision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("mem", "a", quota, now),
            Decision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("time", "a", quota, now),
            Decision::Limited { .. }
        ));
    }

    #[test]
    fn test_prune_expired_windows() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        limiter.check_at("all", "a", Quota::new(1, Duration::from_secs(1)), now);
        limiter.check_at("update", "a", Quota::new(3, Duration::from_secs(3600)), now);

        let removed = limiter.prune(now + Duration::from_secs(5));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_client_key_prefers_proxy_header() {
        let mut headers = HeaderMap::new();
        headers.insert(PROXY_CLIENT_IP_HEADER, HeaderValue::from_static(" 203.0.113.9 "));
        let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();

        assert_eq!(client_key(&headers, Some(peer), true), "203.0.113.9");
        assert_eq!(client_key(&headers, Some(peer), false), "127.0.0.1");
        assert_eq!(client_key(&HeaderMap::new(), None, true), "unknown");
    }
}
