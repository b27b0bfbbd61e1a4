//! # Rate/Abuse Shield
//!
//! First line of request defense:
//! - Fixed-window per-client rate limiting keyed by origin address.
//! - Duplicate-query-parameter rejection (parameter-pollution guard).
//! - Hardening headers stamped on every response.
//!
//! The limiter is in-memory. Windows are tracked per client key in a
//! `DashMap`; a stale entry resets on its next request rather than being
//! swept, so memory stays proportional to distinct recent clients.

use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::audit::RequestOrigin;
use crate::error::AppError;
use crate::state::AppState;

/// Per-key fixed window state.
#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window per-client rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

/// Outcome of a limiter check.
#[derive(Debug, PartialEq, Eq)]
pub enum LimitDecision {
    Allowed,
    /// Over the ceiling; carries seconds until the window resets.
    Limited { retry_after_secs: u64 },
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }

    /// Count a request against the key's current window.
    pub fn check(&self, key: &str) -> LimitDecision {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count >= self.max_requests {
            let elapsed = now.duration_since(entry.started);
            let retry_after_secs = self.window.saturating_sub(elapsed).as_secs().max(1);
            return LimitDecision::Limited { retry_after_secs };
        }

        entry.count += 1;
        LimitDecision::Allowed
    }

    /// Distinct client keys currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Derive the request origin (client key and user agent) from headers.
///
/// Trusts the first `X-Forwarded-For` hop — the service sits behind an
/// ingress that sets it. Absent that, the client key is `"direct"`.
pub fn request_origin(headers: &axum::http::HeaderMap) -> RequestOrigin {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    RequestOrigin {
        ip_address,
        user_agent,
    }
}

/// Reject requests whose query string repeats a parameter name.
fn duplicate_query_param(query: &str) -> Option<String> {
    let mut seen: Vec<&str> = Vec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let name = pair.split('=').next().unwrap_or(pair);
        if seen.contains(&name) {
            return Some(name.to_string());
        }
        seen.push(name);
    }
    None
}

const HARDENING_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "same-origin"),
    ("content-security-policy", "default-src 'self'"),
];

fn stamp_hardening_headers(response: &mut Response) {
    for (name, value) in HARDENING_HEADERS {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
}

/// Shield middleware: rate limit, parameter-pollution guard, hardening
/// headers. Runs before sanitization and the compliance gate so abusive
/// traffic is shed as early as possible.
pub async fn shield_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request_origin(request.headers());
    let client_key = origin.ip_address.clone().unwrap_or_else(|| "direct".to_string());

    if let LimitDecision::Limited { retry_after_secs } = state.limiter.check(&client_key) {
        state.audit.record(
            None,
            "RATE_LIMIT_EXCEEDED",
            serde_json::json!({ "path": request.uri().path() }),
            &origin,
        );
        let mut response = AppError::RateLimited { retry_after_secs }.into_response();
        stamp_hardening_headers(&mut response);
        return response;
    }

    if let Some(name) = request.uri().query().and_then(duplicate_query_param) {
        let mut response =
            AppError::BadRequest(format!("duplicate query parameter: {name}")).into_response();
        stamp_hardening_headers(&mut response);
        return response;
    }

    let mut response = next.run(request).await;
    stamp_hardening_headers(&mut response);
    response
}
