// Fixed-window request limiter.
//
// Counters live in-process behind one mutex, keyed by client
// identifier plus endpoint class. A window resets lazily on the first
// request after expiry. Single-process deployments only; replicated
// instances each count independently, so horizontal scaling needs an
// external shared counter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;

use crate::config::{self, RatePreset};
use crate::error::ApiError;

/// Endpoint classes, each with its own window/threshold preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    Read,
    Write,
    Auth,
    Ai,
}

impl EndpointClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Read => "read",
            EndpointClass::Write => "write",
            EndpointClass::Auth => "auth",
            EndpointClass::Ai => "ai",
        }
    }

    fn preset(&self) -> RatePreset {
        let limits = &config::config().rate_limit;
        match self {
            EndpointClass::Read => limits.read,
            EndpointClass::Write => limits.write,
            EndpointClass::Auth => limits.auth,
            EndpointClass::Ai => limits.ai,
        }
    }
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests left in the current window (0 when denied).
    pub remaining: u32,
    /// Milliseconds until the window resets; strictly positive while a
    /// window is active.
    pub reset_time: u64,
}

struct WindowCounter {
    count: u32,
    window_start_ms: u64,
    /// Window length this counter was opened with; the sweep must use
    /// this, not the calling request's preset, since the map mixes
    /// endpoint classes with different windows.
    window_ms: u64,
}

impl WindowCounter {
    fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.window_start_ms + self.window_ms
    }
}

/// Sweep expired counters once the map grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

pub struct RateLimiter {
    counters: Mutex<HashMap<String, WindowCounter>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Check and count one request for `client_id` against the class
    /// preset from config.
    pub fn check(&self, client_id: &str, class: EndpointClass) -> RateDecision {
        self.check_at(client_id, class.as_str(), class.preset(), now_ms())
    }

    /// Clock-injected variant backing `check`; also used by tests.
    pub fn check_at(
        &self,
        client_id: &str,
        class_label: &str,
        preset: RatePreset,
        now_ms: u64,
    ) -> RateDecision {
        let key = format!("{}:{}", class_label, client_id);
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());

        if counters.len() > SWEEP_THRESHOLD {
            counters.retain(|_, w| !w.expired(now_ms));
        }

        let counter = counters.entry(key).or_insert(WindowCounter {
            count: 0,
            window_start_ms: now_ms,
            window_ms: preset.window_ms,
        });

        // Lazy reset on first request after expiry
        if counter.expired(now_ms) {
            counter.count = 0;
            counter.window_start_ms = now_ms;
            counter.window_ms = preset.window_ms;
        }

        let reset_time = (counter.window_start_ms + preset.window_ms).saturating_sub(now_ms);

        if counter.count >= preset.max_requests {
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_time,
            };
        }

        counter.count += 1;
        RateDecision {
            allowed: true,
            remaining: preset.max_requests - counter.count,
            reset_time,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

static LIMITER: Lazy<RateLimiter> = Lazy::new(RateLimiter::new);

/// Endpoint class from the request shape: AI and auth routes have
/// dedicated budgets; everything else splits read/write by method.
pub fn classify(method: &Method, path: &str) -> EndpointClass {
    if path.starts_with("/api/ai/") {
        EndpointClass::Ai
    } else if path.starts_with("/auth") {
        EndpointClass::Auth
    } else if method == Method::GET || method == Method::HEAD {
        EndpointClass::Read
    } else {
        EndpointClass::Write
    }
}

/// App-level limiter layer; classifies each request and applies the
/// class budget.
pub async fn classified_rate_limit_middleware(
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let class = classify(request.method(), request.uri().path());
    rate_limit_middleware(class, request, next).await
}

/// First stage of the request pipeline. Wire per route group with the
/// group's endpoint class.
pub async fn rate_limit_middleware(
    class: EndpointClass,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !config::config().rate_limit.enabled {
        return Ok(next.run(request).await);
    }

    let client_id = client_identifier(request.headers());
    let decision = LIMITER.check(&client_id, class);

    if !decision.allowed {
        tracing::warn!(client = %client_id, class = class.as_str(), "rate limit exceeded");
        return Err(ApiError::too_many_requests(
            "Too many requests, please slow down",
            decision.reset_time.div_ceil(1000),
        ));
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Ok(v) = class.preset().max_requests.to_string().parse() {
        headers.insert("x-ratelimit-limit", v);
    }
    if let Ok(v) = decision.remaining.to_string().parse() {
        headers.insert("x-ratelimit-remaining", v);
    }
    if let Ok(v) = decision.reset_time.to_string().parse() {
        headers.insert("x-ratelimit-reset", v);
    }
    Ok(response)
}

/// Client identity from the forwarded-IP headers; a shared fallback
/// bucket catches requests with neither.
fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_hop) = forwarded.split(',').next() {
            let first_hop = first_hop.trim();
            if !first_hop.is_empty() {
                return first_hop.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const PRESET: RatePreset = RatePreset {
        window_ms: 60_000,
        max_requests: 2,
    };

    #[test]
    fn third_request_in_window_is_denied() {
        let limiter = RateLimiter::new();
        let t0 = 1_000_000;

        let first = limiter.check_at("1.2.3.4", "auth", PRESET, t0);
        assert!(first.allowed);
        let second = limiter.check_at("1.2.3.4", "auth", PRESET, t0 + 10);
        assert!(second.allowed);
        let third = limiter.check_at("1.2.3.4", "auth", PRESET, t0 + 20);
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert!(third.reset_time > 0);
    }

    #[test]
    fn remaining_decreases_monotonically() {
        let limiter = RateLimiter::new();
        let preset = RatePreset { window_ms: 60_000, max_requests: 5 };
        let mut last = u32::MAX;
        for i in 0..5 {
            let decision = limiter.check_at("10.0.0.1", "read", preset, 500 + i);
            assert!(decision.allowed);
            assert!(decision.remaining < last);
            last = decision.remaining;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn window_resets_lazily_after_expiry() {
        let limiter = RateLimiter::new();
        let t0 = 1_000;

        assert!(limiter.check_at("1.2.3.4", "auth", PRESET, t0).allowed);
        assert!(limiter.check_at("1.2.3.4", "auth", PRESET, t0 + 1).allowed);
        assert!(!limiter.check_at("1.2.3.4", "auth", PRESET, t0 + 2).allowed);

        // First request after the window expires starts a fresh count
        let after = limiter.check_at("1.2.3.4", "auth", PRESET, t0 + PRESET.window_ms);
        assert!(after.allowed);
        assert_eq!(after.remaining, PRESET.max_requests - 1);
    }

    #[test]
    fn clients_and_classes_are_tracked_separately() {
        let limiter = RateLimiter::new();
        let t0 = 0;

        assert!(limiter.check_at("1.2.3.4", "auth", PRESET, t0).allowed);
        assert!(limiter.check_at("1.2.3.4", "auth", PRESET, t0).allowed);
        assert!(!limiter.check_at("1.2.3.4", "auth", PRESET, t0).allowed);

        // Different client, same class: unaffected
        assert!(limiter.check_at("5.6.7.8", "auth", PRESET, t0).allowed);
        // Same client, different class: unaffected
        assert!(limiter.check_at("1.2.3.4", "write", PRESET, t0).allowed);
    }

    #[test]
    fn sweep_keeps_active_counters_of_other_classes() {
        let limiter = RateLimiter::new();
        let long = RatePreset { window_ms: 3_600_000, max_requests: 2 };
        let short = RatePreset { window_ms: 1_000, max_requests: 1 };
        let t0 = 0;

        // Exhaust an hour-long window for one client
        assert!(limiter.check_at("1.2.3.4", "write", long, t0).allowed);
        assert!(limiter.check_at("1.2.3.4", "write", long, t0).allowed);
        assert!(!limiter.check_at("1.2.3.4", "write", long, t0).allowed);

        // Grow the map past the sweep threshold with short-lived counters
        for i in 0..=SWEEP_THRESHOLD {
            let client = format!("10.{}.{}.{}", i / 65_536, (i / 256) % 256, i % 256);
            limiter.check_at(&client, "read", short, t0);
        }

        // A short-window call after those expire triggers the sweep;
        // the hour-long counter must survive it
        limiter.check_at("9.9.9.9", "auth", short, t0 + 2_000);
        assert!(!limiter.check_at("1.2.3.4", "write", long, t0 + 2_000).allowed);
    }

    #[test]
    fn client_identifier_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4, 10.0.0.1"));
        assert_eq!(client_identifier(&headers), "1.2.3.4");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_identifier(&headers), "9.9.9.9");

        assert_eq!(client_identifier(&HeaderMap::new()), "unknown");
    }
}
