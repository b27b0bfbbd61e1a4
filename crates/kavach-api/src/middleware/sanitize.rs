//! # Body Sanitization Middleware
//!
//! Sanitizes inbound JSON bodies exactly once, at the boundary. The body
//! is buffered, sanitized via [`kavach_core::sanitize`], and the request
//! is rebuilt around the sanitized bytes; the parsed value is also
//! stashed in request extensions so the compliance gate's document
//! policy stage can inspect it without re-reading the body.
//!
//! Non-JSON requests and unparseable bodies pass through untouched — the
//! handler's `Json` extractor owns the deserialization error.
//!
//! Transport fields ([`TRANSPORT_FIELDS`]) are trimmed but never
//! entity-escaped: MIME types and base64 payloads are consumed by the
//! service itself, and escaping `/` would corrupt them.

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// Sanitized request payload, available to downstream gate stages.
#[derive(Debug, Clone)]
pub struct SanitizedPayload(pub serde_json::Value);

/// Buffering ceiling. The outer `DefaultBodyLimit` already rejects
/// larger bodies; this is the backstop for the buffering call itself.
const MAX_BUFFERED_BODY: usize = 10 * 1024 * 1024;

/// Top-level fields carried for the transport layer, not for rendering.
/// They are validated against fixed allow-lists and decoders downstream,
/// so they keep their raw (trimmed) value.
const TRANSPORT_FIELDS: [&str; 2] = ["contentType", "fileBase64"];

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

/// Middleware that sanitizes JSON request bodies in place.
pub async fn sanitize_middleware(request: Request, next: Next) -> Response {
    if !is_json(&request) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return AppError::BadRequest(format!("failed to read request body: {err}"))
                .into_response()
        }
    };

    let rebuilt = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value) => {
            let mut sanitized = match kavach_core::sanitize(&value) {
                Ok(sanitized) => sanitized,
                Err(err) => return AppError::from(err).into_response(),
            };
            if let (Some(original), Some(out)) = (value.as_object(), sanitized.as_object_mut()) {
                for field in TRANSPORT_FIELDS {
                    if let Some(serde_json::Value::String(raw)) = original.get(field) {
                        out.insert(
                            field.to_string(),
                            serde_json::Value::String(raw.trim().to_string()),
                        );
                    }
                }
            }
            let sanitized_bytes = match serde_json::to_vec(&sanitized) {
                Ok(b) => Bytes::from(b),
                Err(err) => {
                    return AppError::Internal(format!("sanitized body re-encode: {err}"))
                        .into_response()
                }
            };
            let mut request = Request::from_parts(parts, Body::from(sanitized_bytes.clone()));
            // Content-Length must match the rewritten body.
            request.headers_mut().insert(
                axum::http::header::CONTENT_LENGTH,
                axum::http::HeaderValue::from(sanitized_bytes.len()),
            );
            request
                .extensions_mut()
                .insert(SanitizedPayload(sanitized));
            request
        }
        // Let the handler's Json extractor produce the parse error.
        Err(_) => Request::from_parts(parts, Body::from(bytes)),
    };

    next.run(rebuilt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::middleware::from_fn;
    use axum::routing::post;
    use axum::{Json, Router};
    use tower::ServiceExt;

    async fn echo(Json(value): Json<serde_json::Value>) -> Json<serde_json::Value> {
        Json(value)
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", post(echo))
            .layer(from_fn(sanitize_middleware))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn json_body_is_sanitized_before_the_handler() {
        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"<script>x</script>"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["name"], "&lt;script&gt;x&lt;&#x2F;script&gt;");
    }

    #[tokio::test]
    async fn transport_fields_keep_their_raw_value() {
        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"contentType":" image/jpeg ","fileBase64":"QUJD","note":"a/b"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let value = body_json(response).await;
        // MIME type and payload survive intact (trimmed only); ordinary
        // strings still get the full escape treatment.
        assert_eq!(value["contentType"], "image/jpeg");
        assert_eq!(value["fileBase64"], "QUJD");
        assert_eq!(value["note"], "a&#x2F;b");
    }

    #[tokio::test]
    async fn overly_nested_body_rejected() {
        let mut payload = "1".to_string();
        for _ in 0..40 {
            payload = format!("[{payload}]");
        }

        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_reaches_the_extractor() {
        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        // The Json extractor rejects it, not the middleware.
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
