//! # Compliance Gate
//!
//! The access-control pipeline every non-public request passes through.
//! The gate is a fixed sequence of named stages, each a small unit with
//! one decision, run in order by a single runner:
//!
//! 1. [`PublicPathBypass`] — allowlisted paths skip the rest of the gate.
//! 2. [`SessionFreshness`] — requires a live `X-Session-Id`, expires
//!    stale sessions, attaches the actor to the request.
//! 3. [`AuditTrail`] — best-effort access record; never rejects.
//! 4. [`DocumentPolicy`] — early rejection of uploads naming a document
//!    type outside the closed set.
//!
//! Security-classified rejections (missing, unknown, or expired
//! sessions) are themselves written to the audit trail before the error
//! response leaves the gate.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kavach_core::DocumentType;
use uuid::Uuid;

use crate::audit::RequestOrigin;
use crate::error::AppError;
use crate::middleware::sanitize::SanitizedPayload;
use crate::middleware::shield::request_origin;
use crate::session::{Role, SessionCheck};
use crate::state::AppState;

/// Actor attached to the request once the gate has passed it.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub actor_id: String,
    pub role: Role,
}

/// Everything a stage may inspect or annotate.
pub struct GateContext {
    pub state: AppState,
    pub method: Method,
    pub path: String,
    pub origin: RequestOrigin,
    /// Raw `X-Session-Id` header value, if present.
    pub session_header: Option<String>,
    /// Sanitized JSON payload stashed by the sanitize middleware.
    pub payload: Option<serde_json::Value>,
    /// Set by [`SessionFreshness`] on success.
    pub actor: Option<ActorContext>,
}

/// Decision of a single stage.
pub enum StageOutcome {
    /// Proceed to the next stage.
    Continue,
    /// Short-circuit: request is allowed without running later stages.
    Bypass,
    /// Reject the request with this error.
    Reject(AppError),
}

/// One named unit of the gate pipeline.
pub trait GateStage: Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, cx: &mut GateContext) -> StageOutcome;
}

// ─── Stage 1: public path bypass ─────────────────────────────────────────

/// Paths reachable without a session.
pub struct PublicPathBypass;

impl GateStage for PublicPathBypass {
    fn name(&self) -> &'static str {
        "public_path_bypass"
    }

    fn evaluate(&self, cx: &mut GateContext) -> StageOutcome {
        let public = (cx.method == Method::POST && cx.path == "/v1/auth/session")
            || (cx.method == Method::GET && cx.path == "/openapi.json")
            || cx.path.starts_with("/health/");

        if public {
            StageOutcome::Bypass
        } else {
            StageOutcome::Continue
        }
    }
}

// ─── Stage 2: session freshness ──────────────────────────────────────────

/// Requires a live session and refreshes its activity timestamp.
pub struct SessionFreshness;

impl GateStage for SessionFreshness {
    fn name(&self) -> &'static str {
        "session_freshness"
    }

    fn evaluate(&self, cx: &mut GateContext) -> StageOutcome {
        let raw = match &cx.session_header {
            Some(raw) => raw,
            None => {
                return StageOutcome::Reject(AppError::Unauthorized(
                    "missing X-Session-Id header".to_string(),
                ))
            }
        };

        let id = match Uuid::parse_str(raw) {
            Ok(id) => id,
            Err(_) => {
                return StageOutcome::Reject(AppError::Unauthorized(
                    "malformed session id".to_string(),
                ))
            }
        };

        match cx
            .state
            .sessions
            .check_and_refresh(id, cx.state.config.session_timeout)
        {
            SessionCheck::Fresh { actor_id, role } => {
                cx.actor = Some(ActorContext { actor_id, role });
                StageOutcome::Continue
            }
            SessionCheck::Expired => StageOutcome::Reject(AppError::SessionExpired),
            SessionCheck::Unknown => {
                StageOutcome::Reject(AppError::Unauthorized("unknown session".to_string()))
            }
        }
    }
}

// ─── Stage 3: audit trail ────────────────────────────────────────────────

/// Records the access. Best-effort: never rejects.
pub struct AuditTrail;

impl GateStage for AuditTrail {
    fn name(&self) -> &'static str {
        "audit_trail"
    }

    fn evaluate(&self, cx: &mut GateContext) -> StageOutcome {
        let actor_id = cx.actor.as_ref().map(|a| a.actor_id.as_str());

        let mut details = serde_json::json!({
            "method": cx.method.as_str(),
            "path": cx.path,
        });
        // Write-path requests carry their (already sanitized) body. File
        // content is reduced to its length; fields that are encrypted at
        // rest must not land in the trail as plaintext.
        if cx.method != Method::GET {
            if let Some(payload) = &cx.payload {
                let mut body = payload.clone();
                if let Some(file) = body.get_mut("fileBase64") {
                    let len = file.as_str().map(str::len).unwrap_or(0);
                    *file = serde_json::json!(format!("[{len} bytes base64]"));
                }
                for field in ["documentNumber", "gstin"] {
                    if let Some(value) = body.get_mut(field) {
                        *value = serde_json::json!("[redacted]");
                    }
                }
                details["body"] = body;
            }
        }

        cx.state.audit.record(actor_id, "API_ACCESS", details, &cx.origin);
        StageOutcome::Continue
    }
}

// ─── Stage 4: document policy ────────────────────────────────────────────

/// Rejects document uploads naming a type outside the closed set before
/// the handler runs.
pub struct DocumentPolicy;

impl GateStage for DocumentPolicy {
    fn name(&self) -> &'static str {
        "document_policy"
    }

    fn evaluate(&self, cx: &mut GateContext) -> StageOutcome {
        if cx.method != Method::POST || cx.path != "/v1/kyc/documents" {
            return StageOutcome::Continue;
        }

        let declared = cx
            .payload
            .as_ref()
            .and_then(|p| p.get("documentType"))
            .and_then(|v| v.as_str());

        if let Some(raw) = declared {
            if DocumentType::parse(raw).is_none() {
                let actor_id = cx.actor.as_ref().map(|a| a.actor_id.as_str());
                cx.state.audit.record(
                    actor_id,
                    "DOCUMENT_POLICY_REJECTED",
                    serde_json::json!({ "documentType": raw }),
                    &cx.origin,
                );
                return StageOutcome::Reject(AppError::Validation(
                    "invalid or insufficient KYC document".to_string(),
                ));
            }
        }
        // Absent or non-string documentType: the handler's own
        // validation reports the precise field error.
        StageOutcome::Continue
    }
}

// ─── Runner ──────────────────────────────────────────────────────────────

const STAGES: [&(dyn GateStage); 4] = [
    &PublicPathBypass,
    &SessionFreshness,
    &AuditTrail,
    &DocumentPolicy,
];

/// Audit action tag for a security-classified gate rejection.
fn security_action(err: &AppError) -> Option<&'static str> {
    match err {
        AppError::SessionExpired => Some("SESSION_EXPIRED"),
        AppError::Unauthorized(_) => Some("AUTH_REJECTED"),
        AppError::Forbidden(_) => Some("ACCESS_DENIED"),
        _ => None,
    }
}

/// Run every gate stage in order, then hand the request to the router
/// with the actor attached.
pub async fn compliance_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut cx = GateContext {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        origin: request_origin(request.headers()),
        session_header: request
            .headers()
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        payload: request
            .extensions()
            .get::<SanitizedPayload>()
            .map(|p| p.0.clone()),
        actor: None,
        state,
    };

    for stage in STAGES {
        match stage.evaluate(&mut cx) {
            StageOutcome::Continue => {}
            StageOutcome::Bypass => return next.run(request).await,
            StageOutcome::Reject(err) => {
                tracing::warn!(
                    stage = stage.name(),
                    path = %cx.path,
                    error = %err,
                    "compliance gate rejected request"
                );
                if let Some(action) = security_action(&err) {
                    cx.state.audit.record(
                        cx.actor.as_ref().map(|a| a.actor_id.as_str()),
                        action,
                        serde_json::json!({
                            "method": cx.method.as_str(),
                            "path": cx.path,
                            "stage": stage.name(),
                        }),
                        &cx.origin,
                    );
                }
                return err.into_response();
            }
        }
    }

    if let Some(actor) = cx.actor {
        request.extensions_mut().insert(actor);
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditFilter;
    use kavach_core::AuditSeverity;

    fn context(state: AppState, method: Method, path: &str) -> GateContext {
        GateContext {
            state,
            method,
            path: path.to_string(),
            origin: RequestOrigin::default(),
            session_header: None,
            payload: None,
            actor: None,
        }
    }

    #[test]
    fn public_paths_bypass() {
        let state = AppState::for_tests();
        let mut cx = context(state.clone(), Method::POST, "/v1/auth/session");
        assert!(matches!(
            PublicPathBypass.evaluate(&mut cx),
            StageOutcome::Bypass
        ));

        let mut cx = context(state.clone(), Method::GET, "/health/liveness");
        assert!(matches!(
            PublicPathBypass.evaluate(&mut cx),
            StageOutcome::Bypass
        ));

        let mut cx = context(state, Method::GET, "/v1/kyc/status");
        assert!(matches!(
            PublicPathBypass.evaluate(&mut cx),
            StageOutcome::Continue
        ));
    }

    #[test]
    fn missing_session_rejected() {
        let state = AppState::for_tests();
        let mut cx = context(state, Method::GET, "/v1/kyc/status");
        match SessionFreshness.evaluate(&mut cx) {
            StageOutcome::Reject(AppError::Unauthorized(_)) => {}
            _ => panic!("expected Unauthorized"),
        }
    }

    #[test]
    fn fresh_session_attaches_actor() {
        let state = AppState::for_tests();
        let id = state.sessions.issue("user-9", Role::User);

        let mut cx = context(state, Method::GET, "/v1/kyc/status");
        cx.session_header = Some(id.to_string());

        assert!(matches!(
            SessionFreshness.evaluate(&mut cx),
            StageOutcome::Continue
        ));
        let actor = cx.actor.expect("actor attached");
        assert_eq!(actor.actor_id, "user-9");
        assert_eq!(actor.role, Role::User);
    }

    #[test]
    fn expired_session_is_session_expired() {
        let state = AppState::for_tests();
        let id = state.sessions.issue("user-9", Role::User);
        state
            .sessions
            .backdate(id, state.config.session_timeout + std::time::Duration::from_secs(1));

        let mut cx = context(state, Method::GET, "/v1/kyc/status");
        cx.session_header = Some(id.to_string());

        match SessionFreshness.evaluate(&mut cx) {
            StageOutcome::Reject(AppError::SessionExpired) => {}
            _ => panic!("expected SessionExpired"),
        }
    }

    #[test]
    fn audit_stage_records_and_continues() {
        let state = AppState::for_tests();
        let mut cx = context(state.clone(), Method::GET, "/v1/kyc/status");
        cx.actor = Some(ActorContext {
            actor_id: "user-1".to_string(),
            role: Role::User,
        });

        assert!(matches!(AuditTrail.evaluate(&mut cx), StageOutcome::Continue));
        let entries = state.audit.query(&AuditFilter {
            action: Some("API_ACCESS".to_string()),
            ..Default::default()
        });
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, AuditSeverity::Info);
    }

    #[test]
    fn audit_stage_redacts_sensitive_body_fields() {
        let state = AppState::for_tests();
        let mut cx = context(state.clone(), Method::POST, "/v1/kyc/documents");
        cx.payload = Some(serde_json::json!({
            "documentType": "PAN_FRONT",
            "documentNumber": "ABCDE1234F",
            "fileBase64": "QUJD",
        }));

        assert!(matches!(AuditTrail.evaluate(&mut cx), StageOutcome::Continue));
        let entries = state.audit.query(&AuditFilter {
            action: Some("API_ACCESS".to_string()),
            ..Default::default()
        });
        let body = &entries[0].details["body"];
        assert_eq!(body["documentNumber"], "[redacted]");
        assert_eq!(body["fileBase64"], "[4 bytes base64]");
        assert_eq!(body["documentType"], "PAN_FRONT");
    }

    #[test]
    fn unknown_document_type_rejected_by_policy() {
        let state = AppState::for_tests();
        let mut cx = context(state.clone(), Method::POST, "/v1/kyc/documents");
        cx.payload = Some(serde_json::json!({ "documentType": "DRIVING_LICENSE" }));

        match DocumentPolicy.evaluate(&mut cx) {
            StageOutcome::Reject(AppError::Validation(msg)) => {
                assert_eq!(msg, "invalid or insufficient KYC document");
            }
            _ => panic!("expected Validation rejection"),
        }

        let entries = state.audit.query(&AuditFilter {
            action: Some("DOCUMENT_POLICY_REJECTED".to_string()),
            ..Default::default()
        });
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, AuditSeverity::Warning);
    }

    #[test]
    fn known_document_type_passes_policy() {
        let state = AppState::for_tests();
        let mut cx = context(state, Method::POST, "/v1/kyc/documents");
        cx.payload = Some(serde_json::json!({ "documentType": "PAN_FRONT" }));
        assert!(matches!(
            DocumentPolicy.evaluate(&mut cx),
            StageOutcome::Continue
        ));
    }

    #[test]
    fn policy_ignores_other_routes() {
        let state = AppState::for_tests();
        let mut cx = context(state, Method::GET, "/v1/kyc/status");
        cx.payload = Some(serde_json::json!({ "documentType": "BOGUS" }));
        assert!(matches!(
            DocumentPolicy.evaluate(&mut cx),
            StageOutcome::Continue
        ));
    }
}
