//! # kavach-api — Axum KYC Intake & Verification Service
//!
//! Kavach is the document intake and verification layer: users open a
//! compliance session, upload identity documents, and submit a
//! profession profile; the service encrypts identifying numbers at the
//! field level, stores document bytes in object storage, runs pending
//! documents past a verification provider, and exposes an admin surface
//! for manual verdicts and the audit trail.
//!
//! ## API Surface
//!
//! | Route                                  | Module             | Access  |
//! |----------------------------------------|--------------------|---------|
//! | `POST /v1/auth/session`                | [`routes::auth`]   | public  |
//! | `DELETE /v1/auth/session`              | [`routes::auth`]   | session |
//! | `POST /v1/kyc/documents`               | [`routes::kyc`]    | session |
//! | `POST /v1/kyc/profile`                 | [`routes::kyc`]    | session |
//! | `GET /v1/kyc/status`                   | [`routes::kyc`]    | session |
//! | `PUT /v1/kyc/documents/{id}/verify`    | [`routes::admin`]  | admin   |
//! | `GET /v1/kyc/users/{user_id}/documents`| [`routes::admin`]  | admin   |
//! | `GET /v1/audit/logs`                   | [`routes::admin`]  | admin   |
//! | `GET /openapi.json`                    | [`openapi`]        | public  |
//! | `GET /health/liveness`, `/readiness`   | here               | public  |
//! | `GET /metrics`                         | here               | public  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → Cors → Timeout → Metrics → Shield → Sanitize → ComplianceGate → Handler
//! ```
//!
//! The shield (rate limiting, duplicate-parameter rejection, hardening
//! headers) runs before the sanitizer so throttled clients never cost a
//! body buffer; the sanitizer runs before the compliance gate so the
//! gate's document policy stage sees the sanitized payload.

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
pub mod verifier;

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Ceiling on buffered request bodies. Documents arrive base64-encoded
/// inside JSON, so the 5 MiB file ceiling needs ~7 MiB of wire budget;
/// 10 MiB leaves headroom for the surrounding envelope.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Hard deadline on request handling, provider round-trips included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the
/// gated stack so probes and scrapers need no session.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        ))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static("x-session-id"),
        ])
        // Config validation rejects wildcard origins, so credentialed
        // CORS is safe with the explicit allow-list.
        .allow_credentials(true);

    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::kyc::router())
        .merge(routes::admin::router())
        .merge(openapi::router())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::compliance::compliance_gate,
        ))
        .layer(from_fn(middleware::sanitize::sanitize_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::shield::shield_middleware,
        ))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics.clone()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then encodes everything in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // Documents by verification status.
    let mut by_status: HashMap<&'static str, usize> = HashMap::new();
    for doc in state.documents.list() {
        *by_status.entry(doc.verification_status.as_str()).or_default() += 1;
    }
    metrics.documents_total().reset();
    for (status, count) in &by_status {
        metrics
            .documents_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    metrics.audit_entries_total().set(state.audit.len() as f64);
    metrics.sessions_active().set(state.sessions.len() as f64);
    metrics
        .rate_limited_clients()
        .set(state.limiter.tracked_clients() as f64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — 200 whenever the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the service can serve traffic.
///
/// Checks that the in-memory stores are readable and, when Postgres is
/// configured, that a round-trip query succeeds. Returns 200 "ready" or
/// 503 with a diagnostic.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.documents.len();
    let _ = state.professions.len();
    let _ = state.sessions.len();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
