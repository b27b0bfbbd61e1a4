//! # kavach-core — Foundational Types for the Kavach KYC Service
//!
//! This crate provides the domain vocabulary and pure functions used
//! throughout the workspace:
//!
//! - **Document domain types**: [`DocumentType`], [`VerificationStatus`],
//!   [`KycDocument`], and the profession records collected alongside a
//!   KYC submission.
//! - **Audit classification**: [`AuditSeverity`] and the single canonical
//!   action→severity table used by the audit logger.
//! - **Input sanitization**: recursive, depth-bounded neutralization of
//!   markup in inbound JSON payloads, plus the stricter storage-key
//!   sanitizer for values that reach storage-layer predicates.
//! - **Format validation**: the fixed document-type → regex table for
//!   national ID numbers (PAN, Aadhaar, passport, GSTIN).
//!
//! No I/O and no async: everything here is deterministic and unit-testable
//! without a runtime.

pub mod audit;
pub mod document;
pub mod error;
pub mod sanitize;
pub mod validation;

// Re-export primary types.
pub use audit::{classify_severity, AuditSeverity};
pub use document::{
    AnnualIncome, DocumentType, KycDocument, Profession, Sector, UserProfession,
    VerificationStatus,
};
pub use error::ValidationError;
pub use sanitize::{sanitize, sanitize_storage_key, SanitizeError, MAX_DEPTH};
pub use validation::{validate_document_number, validate_upload};
