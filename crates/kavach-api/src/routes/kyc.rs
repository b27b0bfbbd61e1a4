//! # KYC Intake API
//!
//! User-facing intake endpoints. Document bytes arrive as URL-safe
//! base64 in the JSON body (the boundary sanitizer leaves that alphabet
//! untouched), are validated against the size and content-type policy,
//! and go straight to the object store — only the locator is retained.
//! Document numbers and GSTINs are encrypted with a write-time
//! round-trip check before any record is stored.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use base64::engine::general_purpose::URL_SAFE as BASE64_URL;
use base64::Engine;
use chrono::{DateTime, Utc};
use kavach_core::{
    sanitize_storage_key, validate_document_number, validate_upload, AnnualIncome, DocumentType,
    KycDocument, Profession, Sector, UserProfession, VerificationStatus,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::middleware::compliance::ActorContext;
use crate::middleware::shield::request_origin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/kyc/documents", post(upload_document))
        .route("/v1/kyc/profile", post(submit_profile))
        .route("/v1/kyc/status", get(kyc_status))
}

// ─── Upload ──────────────────────────────────────────────────────────────

/// Request to upload a KYC document.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentRequest {
    pub document_type: DocumentType,
    /// Identifying number, required for types with a registered pattern.
    pub document_number: Option<String>,
    /// MIME type of the file content.
    pub content_type: String,
    /// File bytes, URL-safe base64.
    pub file_base64: String,
}

impl Validate for UploadDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.file_base64.is_empty() {
            return Err("fileBase64 must be non-empty".to_string());
        }
        if self.content_type.trim().is_empty() {
            return Err("contentType must be non-empty".to_string());
        }
        Ok(())
    }
}

/// Stored document, as exposed to its owner. The encrypted number token
/// and the storage locator stay internal.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: Uuid,
    pub document_type: DocumentType,
    pub verification_status: VerificationStatus,
    pub verification_notes: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&KycDocument> for DocumentSummary {
    fn from(doc: &KycDocument) -> Self {
        Self {
            id: doc.id,
            document_type: doc.document_type,
            verification_status: doc.verification_status,
            verification_notes: doc.verification_notes.clone(),
            verified_at: doc.verified_at,
            created_at: doc.created_at,
        }
    }
}

/// POST /v1/kyc/documents — upload a document.
#[utoipa::path(
    post,
    path = "/v1/kyc/documents",
    request_body = UploadDocumentRequest,
    responses(
        (status = 201, description = "Document stored, verification pending", body = DocumentSummary),
        (status = 400, description = "Policy or format rejection"),
    ),
    tag = "kyc"
)]
pub(crate) async fn upload_document(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    headers: HeaderMap,
    body: Result<Json<UploadDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentSummary>), AppError> {
    let req = extract_validated_json(body)?;
    let origin = request_origin(&headers);
    let document_type = req.document_type;

    match store_document(&state, &actor.actor_id, req).await {
        Ok(doc) => {
            state.audit.record(
                Some(&actor.actor_id),
                "DOCUMENT_UPLOAD",
                serde_json::json!({
                    "documentId": doc.id,
                    "documentType": doc.document_type,
                }),
                &origin,
            );
            Ok((StatusCode::CREATED, Json(DocumentSummary::from(&doc))))
        }
        Err(err) => {
            state.audit.record(
                Some(&actor.actor_id),
                "DOCUMENT_UPLOAD_ERROR",
                serde_json::json!({
                    "documentType": document_type,
                    "error": err.to_string(),
                }),
                &origin,
            );
            Err(err)
        }
    }
}

async fn store_document(
    state: &AppState,
    user_id: &str,
    req: UploadDocumentRequest,
) -> Result<KycDocument, AppError> {
    let bytes = BASE64_URL
        .decode(req.file_base64.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("fileBase64 is not valid base64: {e}")))?;

    let number = req
        .document_number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    validate_upload(req.document_type, number, bytes.len(), &req.content_type)?;

    let encrypted_number = state.cipher.encrypt_verified(number)?;

    let key = sanitize_storage_key(&format!(
        "{user_id}_{}_{}",
        req.document_type,
        Utc::now().timestamp_millis()
    ));
    let locator = state
        .object_store
        .put(bytes, &key, &req.content_type)
        .await?;

    let doc = KycDocument {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        document_type: req.document_type,
        document_number: encrypted_number,
        document_locator: locator,
        verification_status: VerificationStatus::Pending,
        verification_notes: None,
        verified_at: None,
        created_at: Utc::now(),
    };

    state.documents.insert(doc.id, doc.clone());
    if let Some(pool) = &state.db_pool {
        db::documents::insert(pool, &doc).await?;
    }

    Ok(doc)
}

// ─── Profile ─────────────────────────────────────────────────────────────

/// Profile submission: profession details plus the trigger for provider
/// verification of the user's pending documents.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProfileRequest {
    pub profession: Profession,
    pub sector: Option<Sector>,
    pub platform: Option<String>,
    pub company_name: Option<String>,
    pub gstin: Option<String>,
    pub annual_income: AnnualIncome,
}

impl Validate for SubmitProfileRequest {
    fn validate(&self) -> Result<(), String> {
        match self.profession {
            Profession::Employee if self.sector.is_none() => {
                return Err("sector is required for EMPLOYEE".to_string());
            }
            Profession::GigEconomy
                if self.platform.as_deref().map_or(true, |p| p.trim().is_empty()) =>
            {
                return Err("platform is required for GIG_ECONOMY".to_string());
            }
            Profession::Msme => {
                if self
                    .company_name
                    .as_deref()
                    .map_or(true, |c| c.trim().is_empty())
                {
                    return Err("companyName is required for MSME".to_string());
                }
                if self.gstin.as_deref().map_or(true, |g| g.trim().is_empty()) {
                    return Err("gstin is required for MSME".to_string());
                }
            }
            _ => {}
        }

        if let Some(gstin) = self.gstin.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            if !validate_document_number(DocumentType::GstinCertificate, gstin) {
                return Err("gstin does not match the GSTIN format".to_string());
            }
        }
        Ok(())
    }
}

/// Verification outcome for one document, as reported to the caller.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub document_id: Uuid,
    pub document_type: DocumentType,
    pub verification_status: VerificationStatus,
}

/// Response to a profile submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProfileResponse {
    pub profession: Profession,
    pub annual_income: AnnualIncome,
    /// Outcomes of the verification sweep over pending documents.
    pub verifications: Vec<VerificationOutcome>,
}

/// POST /v1/kyc/profile — submit profession details and trigger
/// verification of pending documents.
#[utoipa::path(
    post,
    path = "/v1/kyc/profile",
    request_body = SubmitProfileRequest,
    responses(
        (status = 201, description = "Profile stored, verification swept", body = SubmitProfileResponse),
        (status = 400, description = "Profession rules violated"),
    ),
    tag = "kyc"
)]
pub(crate) async fn submit_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
    headers: HeaderMap,
    body: Result<Json<SubmitProfileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitProfileResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let origin = request_origin(&headers);

    let gstin = req.gstin.as_deref().map(str::trim).filter(|g| !g.is_empty());
    let encrypted_gstin = state.cipher.encrypt_verified(gstin)?;

    let record = UserProfession {
        id: Uuid::new_v4(),
        user_id: actor.actor_id.clone(),
        profession: req.profession,
        sector: req.sector,
        platform: req.platform.clone(),
        company_name: req.company_name.clone(),
        gstin: encrypted_gstin,
        annual_income: req.annual_income,
        created_at: Utc::now(),
    };

    state.professions.insert(actor.actor_id.clone(), record.clone());
    if let Some(pool) = &state.db_pool {
        db::professions::upsert(pool, &record).await?;
    }

    state.audit.record(
        Some(&actor.actor_id),
        "PROFILE_SUBMIT",
        serde_json::json!({ "profession": req.profession }),
        &origin,
    );

    let verifications = verify_pending_documents(&state, &actor.actor_id, &origin).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitProfileResponse {
            profession: req.profession,
            annual_income: req.annual_income,
            verifications,
        }),
    ))
}

/// Run the verification provider over every pending document of a user.
///
/// The monotonic invariant is enforced at the store: only records still
/// PENDING at update time take the provider's judgment.
async fn verify_pending_documents(
    state: &AppState,
    user_id: &str,
    origin: &crate::audit::RequestOrigin,
) -> Result<Vec<VerificationOutcome>, AppError> {
    let pending = state.documents.filter(|d| {
        d.user_id == user_id && d.verification_status == VerificationStatus::Pending
    });

    let mut outcomes = Vec::with_capacity(pending.len());
    for doc in pending {
        let judgment = state
            .verifier
            .verify(&doc.document_locator, doc.document_type)
            .await;

        let now = Utc::now();
        let verified_at = (judgment.status == VerificationStatus::Verified).then_some(now);
        let notes = Some(judgment.provider_result.clone());

        let applied = state.documents.try_update(&doc.id, |d| {
            if d.verification_status != VerificationStatus::Pending {
                return Err(());
            }
            d.verification_status = judgment.status;
            d.verification_notes = notes.clone();
            d.verified_at = verified_at;
            Ok(())
        });

        if !matches!(applied, Some(Ok(()))) {
            continue;
        }

        if let Some(pool) = &state.db_pool {
            db::documents::update_verification(
                pool,
                doc.id,
                judgment.status,
                notes.as_deref(),
                verified_at,
            )
            .await?;
        }

        let action = match judgment.status {
            VerificationStatus::Verified => "DOCUMENT_VERIFIED",
            _ => "DOCUMENT_REJECTED",
        };
        state.audit.record(
            Some(user_id),
            action,
            serde_json::json!({
                "documentId": doc.id,
                "documentType": doc.document_type,
                "providerResult": judgment.provider_result,
            }),
            origin,
        );

        outcomes.push(VerificationOutcome {
            document_id: doc.id,
            document_type: doc.document_type,
            verification_status: judgment.status,
        });
    }

    Ok(outcomes)
}

// ─── Status ──────────────────────────────────────────────────────────────

/// Aggregate KYC standing of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    NotStarted,
    Pending,
    Verified,
    Rejected,
}

/// Response to a status query.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KycStatusResponse {
    pub overall: OverallStatus,
    pub documents: Vec<DocumentSummary>,
    pub profile_submitted: bool,
}

/// Derive the aggregate standing from individual document states.
fn overall_status(documents: &[KycDocument]) -> OverallStatus {
    if documents.is_empty() {
        return OverallStatus::NotStarted;
    }
    if documents
        .iter()
        .any(|d| d.verification_status == VerificationStatus::Rejected)
    {
        return OverallStatus::Rejected;
    }
    if documents
        .iter()
        .all(|d| d.verification_status == VerificationStatus::Verified)
    {
        return OverallStatus::Verified;
    }
    OverallStatus::Pending
}

/// GET /v1/kyc/status — the caller's own KYC standing.
#[utoipa::path(
    get,
    path = "/v1/kyc/status",
    responses(
        (status = 200, description = "Current KYC standing", body = KycStatusResponse),
    ),
    tag = "kyc"
)]
pub(crate) async fn kyc_status(
    State(state): State<AppState>,
    Extension(actor): Extension<ActorContext>,
) -> Json<KycStatusResponse> {
    let mut documents = state.documents.filter(|d| d.user_id == actor.actor_id);
    documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let overall = overall_status(&documents);
    let profile_submitted = state.professions.get(&actor.actor_id).is_some();

    Json(KycStatusResponse {
        overall,
        documents: documents.iter().map(DocumentSummary::from).collect(),
        profile_submitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(status: VerificationStatus) -> KycDocument {
        KycDocument {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            document_type: DocumentType::PanFront,
            document_number: None,
            document_locator: "mem://b/document/k".to_string(),
            verification_status: status,
            verification_notes: None,
            verified_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn overall_status_aggregation() {
        assert_eq!(overall_status(&[]), OverallStatus::NotStarted);
        assert_eq!(
            overall_status(&[doc(VerificationStatus::Pending)]),
            OverallStatus::Pending
        );
        assert_eq!(
            overall_status(&[
                doc(VerificationStatus::Verified),
                doc(VerificationStatus::Verified)
            ]),
            OverallStatus::Verified
        );
        // One rejection dominates.
        assert_eq!(
            overall_status(&[
                doc(VerificationStatus::Verified),
                doc(VerificationStatus::Rejected)
            ]),
            OverallStatus::Rejected
        );
    }

    #[test]
    fn msme_profile_requires_company_and_gstin() {
        let req = SubmitProfileRequest {
            profession: Profession::Msme,
            sector: None,
            platform: None,
            company_name: Some("Acme Traders".to_string()),
            gstin: None,
            annual_income: AnnualIncome::OneToFiveLakh,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn msme_profile_rejects_malformed_gstin() {
        let req = SubmitProfileRequest {
            profession: Profession::Msme,
            sector: None,
            platform: None,
            company_name: Some("Acme Traders".to_string()),
            gstin: Some("NOT-A-GSTIN".to_string()),
            annual_income: AnnualIncome::OneToFiveLakh,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn employee_profile_requires_sector() {
        let req = SubmitProfileRequest {
            profession: Profession::Employee,
            sector: None,
            platform: None,
            company_name: None,
            gstin: None,
            annual_income: AnnualIncome::FiveToTenLakh,
        };
        assert!(req.validate().is_err());

        let req = SubmitProfileRequest {
            sector: Some(Sector::Private),
            ..req
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn student_profile_has_no_extra_requirements() {
        let req = SubmitProfileRequest {
            profession: Profession::Student,
            sector: None,
            platform: None,
            company_name: None,
            gstin: None,
            annual_income: AnnualIncome::Below1Lakh,
        };
        assert!(req.validate().is_ok());
    }
}
