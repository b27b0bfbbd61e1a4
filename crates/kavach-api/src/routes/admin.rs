//! # Admin Review API
//!
//! Admin-only surface: manual verification verdicts, per-user document
//! listings with decrypted numbers and signed download URLs, and the
//! audit trail query. Every handler checks the actor's role; a non-admin
//! hitting these routes is an `ACCESS_DENIED` audit entry.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use kavach_core::{sanitize_storage_key, DocumentType, VerificationStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditFilter, AuditLogEntry, RequestOrigin};
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::middleware::compliance::ActorContext;
use crate::middleware::shield::request_origin;
use crate::session::Role;
use crate::state::AppState;

/// Lifetime of signed download URLs handed to admins.
const SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/kyc/documents/:id/verify", put(verify_document))
        .route("/v1/kyc/users/:user_id/documents", get(user_documents))
        .route("/v1/audit/logs", get(audit_logs))
}

/// Reject non-admin actors, recording the attempt.
fn require_admin(
    state: &AppState,
    actor: &ActorContext,
    origin: &RequestOrigin,
    path: &str,
) -> Result<(), AppError> {
    if actor.role == Role::Admin {
        return Ok(());
    }
    state.audit.record(
        Some(&actor.actor_id),
        "ACCESS_DENIED",
        serde_json::json!({ "path": path }),
        origin,
    );
    Err(AppError::Forbidden("admin role required".to_string()))
}

// ─── Manual verification ─────────────────────────────────────────────────

/// Admin verdict on a document.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDocumentRequest {
    /// Target status: VERIFIED or REJECTED.
    pub status: VerificationStatus,
    pub notes: Option<String>,
}

impl Validate for VerifyDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.status == VerificationStatus::Pending {
            return Err("status must be VERIFIED or REJECTED".to_string());
        }
        Ok(())
    }
}

/// Updated verification state.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDocumentResponse {
    pub document_id: Uuid,
    pub verification_status: VerificationStatus,
    pub verified_at: Option<DateTime<Utc>>,
}

/// PUT /v1/kyc/documents/{id}/verify — record an admin verdict.
///
/// VERIFIED is terminal: a second verdict on a verified document is a
/// 409, never a silent overwrite.
#[utoipa::path(
    put,
    path = "/v1/kyc/documents/{id}/verify",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = VerifyDocumentRequest,
    responses(
        (status = 200, description = "Verdict recorded", body = VerifyDocumentResponse),
        (status = 404, description = "No such document"),
        (status = 409, description = "Document already verified"),
    ),
    tag = "admin"
)]
pub(crate) async fn verify_document(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Result<Json<VerifyDocumentRequest>, JsonRejection>,
) -> Result<Json<VerifyDocumentResponse>, AppError> {
    let origin = request_origin(&headers);
    require_admin(&state, &actor, &origin, "/v1/kyc/documents/{id}/verify")?;
    let req = extract_validated_json(body)?;

    let now = Utc::now();
    let verified_at = (req.status == VerificationStatus::Verified).then_some(now);
    let notes = req.notes.clone();

    let applied = state
        .documents
        .try_update(&id, |doc| {
            if doc.verification_status.is_terminal() {
                return Err(AppError::Conflict("document already verified".to_string()));
            }
            doc.verification_status = req.status;
            doc.verification_notes = notes.clone();
            doc.verified_at = verified_at;
            Ok(doc.user_id.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("document {id}")))?;

    let owner = applied?;

    if let Some(pool) = &state.db_pool {
        db::documents::update_verification(pool, id, req.status, notes.as_deref(), verified_at)
            .await?;
    }

    state.audit.record(
        Some(&actor.actor_id),
        "DOCUMENT_VERIFY",
        serde_json::json!({
            "documentId": id,
            "owner": owner,
            "status": req.status,
        }),
        &origin,
    );

    Ok(Json(VerifyDocumentResponse {
        document_id: id,
        verification_status: req.status,
        verified_at,
    }))
}

// ─── Per-user document review ────────────────────────────────────────────

/// A document as seen by an admin reviewer: decrypted number and a
/// signed, time-limited download URL.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDocumentView {
    pub id: Uuid,
    pub document_type: DocumentType,
    /// Decrypted identifying number; `null` when absent or undecryptable.
    pub document_number: Option<String>,
    /// Signed download URL; `null` when the object is unavailable.
    pub download_url: Option<String>,
    pub verification_status: VerificationStatus,
    pub verification_notes: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// GET /v1/kyc/users/{user_id}/documents — review a user's documents.
#[utoipa::path(
    get,
    path = "/v1/kyc/users/{user_id}/documents",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User's documents with decrypted numbers", body = Vec<AdminDocumentView>),
        (status = 404, description = "User has no documents"),
    ),
    tag = "admin"
)]
pub(crate) async fn user_documents(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<AdminDocumentView>>, AppError> {
    let origin = request_origin(&headers);
    require_admin(&state, &actor, &origin, "/v1/kyc/users/{user_id}/documents")?;

    let user_id = sanitize_storage_key(&user_id);
    let mut documents = state.documents.filter(|d| d.user_id == user_id);
    if documents.is_empty() {
        return Err(AppError::NotFound(format!("no documents for user {user_id}")));
    }
    documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut views = Vec::with_capacity(documents.len());
    for doc in documents {
        // An undecryptable token or a missing object degrades that field
        // to null rather than failing the whole review listing.
        let document_number = match &doc.document_number {
            Some(token) => match state.cipher.decrypt(token) {
                Ok(plain) => Some(plain),
                Err(err) => {
                    tracing::warn!(document_id = %doc.id, error = %err, "stored number token failed to decrypt");
                    None
                }
            },
            None => None,
        };

        let download_url = match state
            .object_store
            .signed_read_url(&doc.document_locator, SIGNED_URL_TTL)
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(document_id = %doc.id, error = %err, "signing download URL failed");
                None
            }
        };

        views.push(AdminDocumentView {
            id: doc.id,
            document_type: doc.document_type,
            document_number,
            download_url,
            verification_status: doc.verification_status,
            verification_notes: doc.verification_notes,
            verified_at: doc.verified_at,
            created_at: doc.created_at,
        });
    }

    state.audit.record(
        Some(&actor.actor_id),
        "ADMIN_DOCUMENT_REVIEW",
        serde_json::json!({ "userId": user_id, "documents": views.len() }),
        &origin,
    );

    Ok(Json(views))
}

// ─── Audit trail ─────────────────────────────────────────────────────────

/// Query parameters for the audit trail.
#[derive(Debug, Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub severity: Option<kavach_core::AuditSeverity>,
}

/// GET /v1/audit/logs — query the audit trail, newest first, capped at
/// 100 entries.
#[utoipa::path(
    get,
    path = "/v1/audit/logs",
    params(
        ("userId" = Option<String>, Query, description = "Filter by acting user"),
        ("action" = Option<String>, Query, description = "Filter by action tag"),
        ("severity" = Option<String>, Query, description = "Filter by severity"),
    ),
    responses(
        (status = 200, description = "Matching audit entries", body = Vec<AuditLogEntry>),
    ),
    tag = "admin"
)]
pub(crate) async fn audit_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    headers: HeaderMap,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    let origin = request_origin(&headers);
    require_admin(&state, &actor, &origin, "/v1/audit/logs")?;

    let filter = AuditFilter {
        user_id: query.user_id.as_deref().map(sanitize_storage_key),
        action: query.action.as_deref().map(sanitize_storage_key),
        severity: query.severity,
    };

    let entries = match &state.db_pool {
        Some(pool) => db::audit::query(pool, &filter).await?,
        None => state.audit.query(&filter),
    };

    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_verdict_rejected() {
        let req = VerifyDocumentRequest {
            status: VerificationStatus::Pending,
            notes: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn terminal_verdicts_accepted() {
        for status in [VerificationStatus::Verified, VerificationStatus::Rejected] {
            let req = VerifyDocumentRequest { status, notes: None };
            assert!(req.validate().is_ok());
        }
    }

    #[test]
    fn non_admin_is_denied_and_audited() {
        let state = AppState::for_tests();
        let actor = ActorContext {
            actor_id: "user-1".to_string(),
            role: Role::User,
        };
        let err = require_admin(&state, &actor, &RequestOrigin::default(), "/v1/audit/logs")
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let denied = state.audit.query(&AuditFilter {
            action: Some("ACCESS_DENIED".to_string()),
            ..Default::default()
        });
        assert_eq!(denied.len(), 1);
    }

    #[test]
    fn admin_passes_the_role_check() {
        let state = AppState::for_tests();
        let actor = ActorContext {
            actor_id: "admin-1".to_string(),
            role: Role::Admin,
        };
        assert!(require_admin(&state, &actor, &RequestOrigin::default(), "/x").is_ok());
    }
}
