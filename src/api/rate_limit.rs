//! Per-client request quotas, one per endpoint group.
//!
//! Clients are keyed by the first `X-Forwarded-For` hop, then `X-Real-IP`,
//! then the peer address of the connection.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;
use tracing::warn;

use super::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointGroup {
    Compare,
    Health,
    Teams,
    History,
    Other,
}

impl EndpointGroup {
    pub fn for_path(path: &str) -> Self {
        if path.starts_with("/api/compare") {
            EndpointGroup::Compare
        } else if path == "/health" || path.starts_with("/health/") {
            EndpointGroup::Health
        } else if path.starts_with("/api/teams") {
            EndpointGroup::Teams
        } else if path.starts_with("/api/matchups") {
            EndpointGroup::History
        } else {
            EndpointGroup::Other
        }
    }

    /// Requests per minute allowed for one client
    pub fn per_minute(self) -> u32 {
        match self {
            // Fans out to every provider on a cache miss
            EndpointGroup::Compare => 10,
            EndpointGroup::Health => 120,
            EndpointGroup::Teams | EndpointGroup::History => 30,
            EndpointGroup::Other => 60,
        }
    }
}

fn keyed(group: EndpointGroup) -> DefaultKeyedRateLimiter<String> {
    let n = NonZeroU32::new(group.per_minute()).unwrap_or(NonZeroU32::MIN);
    RateLimiter::keyed(Quota::per_minute(n))
}

pub struct RateLimits {
    compare: DefaultKeyedRateLimiter<String>,
    health: DefaultKeyedRateLimiter<String>,
    teams: DefaultKeyedRateLimiter<String>,
    history: DefaultKeyedRateLimiter<String>,
    other: DefaultKeyedRateLimiter<String>,
    clock: DefaultClock,
}

impl RateLimits {
    pub fn new() -> Self {
        RateLimits {
            compare: keyed(EndpointGroup::Compare),
            health: keyed(EndpointGroup::Health),
            teams: keyed(EndpointGroup::Teams),
            history: keyed(EndpointGroup::History),
            other: keyed(EndpointGroup::Other),
            clock: DefaultClock::default(),
        }
    }

    fn limiter(&self, group: EndpointGroup) -> &DefaultKeyedRateLimiter<String> {
        match group {
            EndpointGroup::Compare => &self.compare,
            EndpointGroup::Health => &self.health,
            EndpointGroup::Teams => &self.teams,
            EndpointGroup::History => &self.history,
            EndpointGroup::Other => &self.other,
        }
    }

    /// Count one request from `client`; on refusal returns how long to wait.
    pub fn check(&self, group: EndpointGroup, client: &str) -> Result<(), Duration> {
        self.limiter(group)
            .check_key(&client.to_string())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Forget clients whose quota has fully replenished.
    pub fn retain_recent(&self) {
        for group in [
            EndpointGroup::Compare,
            EndpointGroup::Health,
            EndpointGroup::Teams,
            EndpointGroup::History,
            EndpointGroup::Other,
        ] {
            self.limiter(group).retain_recent();
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}

/// Client key for rate limiting.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    if let Some(first) = header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    if let Some(real) = header("x-real-ip") {
        return real.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware: refuse with 429 once the client's quota for this route is spent.
pub async fn enforce(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let Some(limits) = state.limits.as_deref() else {
        return next.run(req).await;
    };
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_ip(req.headers(), peer);
    let group = EndpointGroup::for_path(req.uri().path());

    match limits.check(group, &client) {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            warn!(
                "Rate limit exceeded for {} on {} ({}/minute)",
                client,
                req.uri().path(),
                group.per_minute()
            );
            too_many_requests(group, wait)
        }
    }
}

fn too_many_requests(group: EndpointGroup, wait: Duration) -> Response {
    let retry_after = wait.as_secs().max(1);
    let mut headers = HeaderMap::new();
    headers.insert("retry-after", HeaderValue::from(retry_after));
    headers.insert("x-ratelimit-limit", HeaderValue::from(group.per_minute()));
    (
        StatusCode::TOO_MANY_REQUESTS,
        headers,
        Json(json!({
            "error": "Rate limit exceeded",
            "detail": format!("Too many requests: {} per minute allowed", group.per_minute()),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_map_to_groups() {
        assert_eq!(EndpointGroup::for_path("/api/compare"), EndpointGroup::Compare);
        assert_eq!(EndpointGroup::for_path("/health"), EndpointGroup::Health);
        assert_eq!(EndpointGroup::for_path("/health/ready"), EndpointGroup::Health);
        assert_eq!(EndpointGroup::for_path("/healthz"), EndpointGroup::Other);
        assert_eq!(EndpointGroup::for_path("/api/teams/lakers"), EndpointGroup::Teams);
        assert_eq!(EndpointGroup::for_path("/api/matchups/abc"), EndpointGroup::History);
        assert_eq!(EndpointGroup::for_path("/api/cache"), EndpointGroup::Other);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_headers() {
        let peer: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "10.1.2.3");
        assert_eq!(client_ip(&headers, None), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers, Some(peer)), "198.51.100.4");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" , "));
        assert_eq!(client_ip(&headers, Some(peer)), "198.51.100.4");
    }

    #[test]
    fn test_quota_is_per_client_and_per_group() {
        let limits = RateLimits::new();
        for _ in 0..EndpointGroup::Compare.per_minute() {
            assert!(limits.check(EndpointGroup::Compare, "203.0.113.7").is_ok());
        }
        let wait = limits.check(EndpointGroup::Compare, "203.0.113.7").unwrap_err();
        assert!(wait > Duration::ZERO && wait <= Duration::from_secs(60));

        assert!(limits.check(EndpointGroup::Compare, "203.0.113.8").is_ok());
        assert!(limits.check(EndpointGroup::Health, "203.0.113.7").is_ok());
        limits.retain_recent();
    }

    #[test]
    fn test_refusal_carries_retry_headers() {
        let resp = too_many_requests(EndpointGroup::Compare, Duration::from_millis(300));
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()["retry-after"], "1");
        assert_eq!(resp.headers()["x-ratelimit-limit"], "10");
    }
}
