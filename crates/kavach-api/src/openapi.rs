//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the session-header security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Session-Id"))),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kavach API — KYC Document Intake & Verification",
        version = "0.3.2",
        description = "KYC intake and verification service.\n\nProvides:\n- **Document intake** with format validation, field encryption, and object storage\n- **Profile submission** with profession rules and provider verification of pending documents\n- **Admin review** with manual verdicts, decrypted numbers, and signed download URLs\n- **Audit trail** with server-derived severity classification\n\nAuthentication: compliance session via the `X-Session-Id` header, issued by `POST /v1/auth/session`. Health probes (`/health/*`) and `/metrics` are unauthenticated.",
        license(name = "BUSL-1.1"),
    ),
    servers(
        (url = "http://localhost:4000", description = "Local development server"),
    ),
    security(
        ("session_id" = [])
    ),
    paths(
        // ── Sessions ─────────────────────────────────────────────────────
        crate::routes::auth::issue_session,
        crate::routes::auth::revoke_session,
        // ── KYC intake ───────────────────────────────────────────────────
        crate::routes::kyc::upload_document,
        crate::routes::kyc::submit_profile,
        crate::routes::kyc::kyc_status,
        // ── Admin review ─────────────────────────────────────────────────
        crate::routes::admin::verify_document,
        crate::routes::admin::user_documents,
        crate::routes::admin::audit_logs,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::auth::IssueSessionRequest,
        crate::routes::auth::SessionResponse,
        crate::routes::kyc::UploadDocumentRequest,
        crate::routes::kyc::DocumentSummary,
        crate::routes::kyc::SubmitProfileRequest,
        crate::routes::kyc::SubmitProfileResponse,
        crate::routes::kyc::VerificationOutcome,
        crate::routes::kyc::OverallStatus,
        crate::routes::kyc::KycStatusResponse,
        crate::routes::admin::VerifyDocumentRequest,
        crate::routes::admin::VerifyDocumentResponse,
        crate::routes::admin::AdminDocumentView,
        crate::audit::AuditLogEntry,
        kavach_core::DocumentType,
        kavach_core::VerificationStatus,
        kavach_core::Profession,
        kavach_core::Sector,
        kavach_core::AnnualIncome,
        kavach_core::AuditSeverity,
        crate::session::Role,
    )),
    tags(
        (name = "auth", description = "Compliance session issuance and revocation"),
        (name = "kyc", description = "Document intake, profile submission, status"),
        (name = "admin", description = "Admin review and audit trail"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
