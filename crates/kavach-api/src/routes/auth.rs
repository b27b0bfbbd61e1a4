//! # Session Endpoints
//!
//! Session issuance (`POST /v1/auth/session`, public) and revocation
//! (`DELETE /v1/auth/session`, gated). Presenting the configured admin
//! key at issuance grants the admin role; the comparison is
//! constant-time. A wrong admin key is a hard rejection, not a silent
//! downgrade to the user role.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::middleware::shield::request_origin;
use crate::session::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/auth/session",
        post(issue_session).delete(revoke_session),
    )
}

/// Request to open a compliance session.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueSessionRequest {
    /// Identifier of the acting user.
    pub user_id: String,
    /// Admin key; when present and correct, grants the admin role.
    pub admin_key: Option<String>,
}

impl Validate for IssueSessionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("userId must be non-empty".to_string());
        }
        if self.user_id.len() > 255 {
            return Err("userId must not exceed 255 characters".to_string());
        }
        Ok(())
    }
}

/// An issued session.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub role: Role,
    /// Inactivity ceiling in seconds.
    pub expires_in_secs: u64,
}

/// POST /v1/auth/session — open a session.
#[utoipa::path(
    post,
    path = "/v1/auth/session",
    request_body = IssueSessionRequest,
    responses(
        (status = 201, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Admin key rejected"),
    ),
    tag = "auth"
)]
pub(crate) async fn issue_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<IssueSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let origin = request_origin(&headers);

    let role = match &req.admin_key {
        Some(presented) => {
            let accepted = state
                .config
                .admin_key
                .as_ref()
                .map(|expected| {
                    bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
                })
                .unwrap_or(false);

            if !accepted {
                state.audit.record(
                    Some(&req.user_id),
                    "AUTH_REJECTED",
                    serde_json::json!({ "reason": "admin key mismatch" }),
                    &origin,
                );
                return Err(AppError::Unauthorized("admin key rejected".to_string()));
            }
            Role::Admin
        }
        None => Role::User,
    };

    let session_id = state.sessions.issue(&req.user_id, role);
    state.audit.record(
        Some(&req.user_id),
        "SESSION_ISSUED",
        serde_json::json!({ "role": role }),
        &origin,
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            role,
            expires_in_secs: state.config.session_timeout.as_secs(),
        }),
    ))
}

/// DELETE /v1/auth/session — revoke the presented session.
#[utoipa::path(
    delete,
    path = "/v1/auth/session",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 404, description = "No such session"),
    ),
    tag = "auth"
)]
pub(crate) async fn revoke_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    // The gate has already validated this header; re-read it for the id.
    let id = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| AppError::Unauthorized("missing X-Session-Id header".to_string()))?;

    if !state.sessions.revoke(id) {
        return Err(AppError::NotFound("session".to_string()));
    }
    state.audit.record(
        None,
        "SESSION_REVOKED",
        serde_json::json!({}),
        &request_origin(&headers),
    );
    Ok(StatusCode::NO_CONTENT)
}
