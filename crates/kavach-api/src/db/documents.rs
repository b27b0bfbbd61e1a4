//! KYC document persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `kyc_documents`
//! table. Document numbers are stored as encrypted tokens — plaintext
//! never reaches this layer.

use chrono::{DateTime, Utc};
use kavach_core::{DocumentType, KycDocument, VerificationStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a new document record.
pub async fn insert(pool: &PgPool, doc: &KycDocument) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO kyc_documents (id, user_id, document_type, document_number,
         document_locator, verification_status, verification_notes, verified_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(doc.id)
    .bind(&doc.user_id)
    .bind(doc.document_type.as_str())
    .bind(&doc.document_number)
    .bind(&doc.document_locator)
    .bind(doc.verification_status.as_str())
    .bind(&doc.verification_notes)
    .bind(doc.verified_at)
    .bind(doc.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update a document's verification outcome.
pub async fn update_verification(
    pool: &PgPool,
    id: Uuid,
    status: VerificationStatus,
    notes: Option<&str>,
    verified_at: Option<DateTime<Utc>>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE kyc_documents
         SET verification_status = $2, verification_notes = $3, verified_at = $4
         WHERE id = $1",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(notes)
    .bind(verified_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all documents into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<KycDocument>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, user_id, document_type, document_number, document_locator,
         verification_status, verification_notes, verified_at, created_at
         FROM kyc_documents ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(DocumentRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    user_id: String,
    document_type: String,
    document_number: Option<String>,
    document_locator: String,
    verification_status: String,
    verification_notes: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    /// Map a row back into the domain record. Rows whose enum columns no
    /// longer parse are skipped with a warning rather than poisoning the
    /// whole load.
    fn into_record(self) -> Option<KycDocument> {
        let document_type = match DocumentType::parse(&self.document_type) {
            Some(dt) => dt,
            None => {
                tracing::warn!(
                    id = %self.id,
                    document_type = %self.document_type,
                    "unknown document_type in database — skipping row"
                );
                return None;
            }
        };
        let verification_status = match VerificationStatus::parse(&self.verification_status) {
            Some(vs) => vs,
            None => {
                tracing::warn!(
                    id = %self.id,
                    status = %self.verification_status,
                    "unknown verification_status in database — skipping row"
                );
                return None;
            }
        };

        Some(KycDocument {
            id: self.id,
            user_id: self.user_id,
            document_type,
            document_number: self.document_number,
            document_locator: self.document_locator,
            verification_status,
            verification_notes: self.verification_notes,
            verified_at: self.verified_at,
            created_at: self.created_at,
        })
    }
}
