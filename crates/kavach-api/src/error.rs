//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain, crypto, and gate errors to HTTP status codes with a JSON
//! error body `{error: {code, message, details?}}`. Internal and
//! cryptographic details are never exposed in production responses;
//! non-production builds (`KAVACH_ENV != "production"`) return the
//! detailed message to ease debugging.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "RATE_LIMITED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client-correctable errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Domain validation failed (400) — user-correctable input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed or violates request shape rules
    /// such as duplicate query parameters (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid session (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Session exists but its last activity exceeds the configured
    /// timeout (401, code `SESSION_EXPIRED`).
    #[error("session expired")]
    SessionExpired,

    /// Authenticated but insufficient role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state, e.g. re-verifying an
    /// already-VERIFIED document (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Per-client request ceiling exceeded (429). Carries the seconds
    /// until the window resets as a retry hint.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Internal server error (500). Message is logged but the client
    /// sees a generic message in production.
    #[error("internal error: {0}")]
    Internal(String),

    /// Verification provider returned an error or is unreachable (502).
    #[error("upstream verification provider error: {0}")]
    Upstream(String),

    /// Service dependency not configured (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::SessionExpired => (StatusCode::UNAUTHORIZED, "SESSION_EXPIRED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }

    /// Construct a service unavailable error (503).
    pub fn service_unavailable(msg: &str) -> Self {
        Self::ServiceUnavailable(msg.to_string())
    }

    /// Construct an upstream error (502 Bad Gateway).
    pub fn upstream(msg: String) -> Self {
        Self::Upstream(msg)
    }

    /// Whether this error is security-classified and must be recorded
    /// as a CRITICAL audit entry by the caller.
    pub fn is_security_classified(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::SessionExpired | Self::Forbidden(_)
        )
    }
}

/// Whether the process runs in a production context. Detailed internal
/// error messages are suppressed when true.
fn production() -> bool {
    std::env::var("KAVACH_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal or crypto details to clients in production.
        let message = match &self {
            Self::Internal(_) | Self::Upstream(_) if production() => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        // Retry hint for throttled clients.
        let details = match &self {
            Self::RateLimited { retry_after_secs } => Some(serde_json::json!({
                "retry_after_secs": retry_after_secs,
            })),
            _ => None,
        };

        // Log server-side errors for operator visibility.
        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Upstream(_) => tracing::error!(error = %self, "upstream provider error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convert domain validation errors to API errors.
impl From<kavach_core::ValidationError> for AppError {
    fn from(err: kavach_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Convert crypto errors to API errors. Integrity and decryption
/// failures abort the operation with a generic message — cryptographic
/// internals are logged, never returned.
impl From<kavach_crypto::CryptoError> for AppError {
    fn from(err: kavach_crypto::CryptoError) -> Self {
        tracing::error!(error = %err, "field encryption failure");
        Self::Internal("field encryption failure".to_string())
    }
}

/// Convert sanitizer errors (depth bound) to API errors.
impl From<kavach_core::SanitizeError> for AppError {
    fn from(err: kavach_core::SanitizeError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Convert database errors to API errors. The driver message is logged,
/// never returned.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database error");
        Self::Internal("database error".to_string())
    }
}

/// Convert object-storage errors to API errors.
impl From<crate::storage::StorageError> for AppError {
    fn from(err: crate::storage::StorageError) -> Self {
        match err {
            crate::storage::StorageError::NotFound(key) => Self::NotFound(key),
            crate::storage::StorageError::Unavailable(msg) => Self::ServiceUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_status_code() {
        let err = AppError::Validation("bad field".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_ERROR");
    }

    #[test]
    fn session_expired_status_code() {
        let (status, code) = AppError::SessionExpired.status_and_code();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "SESSION_EXPIRED");
    }

    #[test]
    fn rate_limited_status_code() {
        let err = AppError::RateLimited { retry_after_secs: 30 };
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(code, "RATE_LIMITED");
    }

    #[test]
    fn conflict_status_code() {
        let err = AppError::Conflict("already verified".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "CONFLICT");
    }

    #[test]
    fn security_classification() {
        assert!(AppError::SessionExpired.is_security_classified());
        assert!(AppError::Forbidden("nope".into()).is_security_classified());
        assert!(AppError::Unauthorized("no session".into()).is_security_classified());
        assert!(!AppError::Validation("x".into()).is_security_classified());
        assert!(!AppError::RateLimited { retry_after_secs: 1 }.is_security_classified());
    }

    #[test]
    fn crypto_errors_map_to_generic_internal() {
        let app_err = AppError::from(kavach_crypto::CryptoError::IntegrityCheck);
        match &app_err {
            AppError::Internal(msg) => assert_eq!(msg, "field encryption failure"),
            other => panic!("expected Internal, got {other:?}"),
        }
    }

    #[test]
    fn validation_error_from_core() {
        let core_err = kavach_core::ValidationError::EmptyDocumentNumber;
        let app_err = AppError::from(core_err);
        assert!(matches!(app_err, AppError::Validation(_)));
    }

    // ── into_response tests ──────────────────────────────────────

    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn into_response_validation() {
        let (status, body) = response_parts(AppError::Validation("bad pan".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        assert!(body.error.message.contains("bad pan"));
    }

    #[tokio::test]
    async fn into_response_rate_limited_carries_retry_hint() {
        let (status, body) =
            response_parts(AppError::RateLimited { retry_after_secs: 42 }).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        let details = body.error.details.expect("retry details");
        assert_eq!(details["retry_after_secs"], 42);
    }

    #[tokio::test]
    async fn into_response_session_expired() {
        let (status, body) = response_parts(AppError::SessionExpired).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error.code, "SESSION_EXPIRED");
        assert!(body.error.message.contains("expired"));
    }

    #[tokio::test]
    async fn into_response_internal_hides_details_in_production() {
        std::env::set_var("KAVACH_ENV", "production");
        let (status, body) =
            response_parts(AppError::Internal("db connection failed".into())).await;
        std::env::remove_var("KAVACH_ENV");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(
            !body.error.message.contains("db connection"),
            "internal error details must not leak: {}",
            body.error.message
        );
    }
}
