//! # Document Number Format Validation
//!
//! A fixed table maps document types to the regular expression their
//! identifying number must match. Types without a registered pattern
//! accept any non-empty number — a deliberate minimal-policy choice so
//! that adding a new document type never silently rejects uploads.
//!
//! Patterns cover the Indian national ID formats the service verifies:
//! PAN (5 letters, 4 digits, 1 letter), Aadhaar (12 digits in groups of
//! four), passport (1 letter, 7 digits), and GSTIN (15-character
//! checksum-shaped tax registration).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::DocumentType;
use crate::error::ValidationError;

static PAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());
static AADHAAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}\s?\d{4}\s?\d{4}$").unwrap());
static PASSPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][0-9]{7}$").unwrap());
static GSTIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").unwrap());

/// Ceiling on uploaded document size: 5 MiB.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Content types accepted for document uploads.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Return the registered pattern for a document type, if any.
fn pattern_for(document_type: DocumentType) -> Option<&'static Regex> {
    match document_type {
        DocumentType::PanFront | DocumentType::PanBack => Some(&PAN),
        DocumentType::AadhaarFront | DocumentType::AadhaarBack => Some(&AADHAAR),
        DocumentType::Passport => Some(&PASSPORT),
        DocumentType::GstinCertificate => Some(&GSTIN),
        _ => None,
    }
}

/// Validate a document number against the pattern registered for its type.
///
/// Empty numbers are always invalid. Types without a registered pattern
/// are valid by default.
pub fn validate_document_number(document_type: DocumentType, number: &str) -> bool {
    if number.is_empty() {
        return false;
    }
    match pattern_for(document_type) {
        Some(re) => re.is_match(number),
        None => true,
    }
}

/// Validate an upload prior to storage: number format (when present),
/// file size ceiling, and content-type allow-list.
pub fn validate_upload(
    document_type: DocumentType,
    document_number: Option<&str>,
    file_size: usize,
    content_type: &str,
) -> Result<(), ValidationError> {
    if let Some(number) = document_number {
        if !validate_document_number(document_type, number) {
            return Err(ValidationError::InvalidDocumentNumber {
                document_type: document_type.as_str().to_string(),
            });
        }
    }

    if file_size > MAX_FILE_SIZE {
        return Err(ValidationError::FileTooLarge {
            size: file_size,
            limit: MAX_FILE_SIZE,
        });
    }

    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(ValidationError::UnsupportedContentType(
            content_type.to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_shape_accepted() {
        assert!(validate_document_number(DocumentType::PanFront, "ABCDE1234F"));
        assert!(validate_document_number(DocumentType::PanBack, "ZYXWV9876A"));
    }

    #[test]
    fn pan_missing_trailing_letter_rejected() {
        assert!(!validate_document_number(DocumentType::PanFront, "ABCDE1234"));
    }

    #[test]
    fn pan_lowercase_rejected() {
        assert!(!validate_document_number(DocumentType::PanFront, "abcde1234f"));
    }

    #[test]
    fn aadhaar_accepts_grouped_and_ungrouped() {
        assert!(validate_document_number(DocumentType::AadhaarFront, "123412341234"));
        assert!(validate_document_number(DocumentType::AadhaarBack, "1234 1234 1234"));
        assert!(!validate_document_number(DocumentType::AadhaarFront, "12341234123"));
    }

    #[test]
    fn passport_shape() {
        assert!(validate_document_number(DocumentType::Passport, "A1234567"));
        assert!(!validate_document_number(DocumentType::Passport, "AB123456"));
    }

    #[test]
    fn gstin_shape() {
        assert!(validate_document_number(
            DocumentType::GstinCertificate,
            "22ABCDE1234F1Z5"
        ));
        assert!(!validate_document_number(
            DocumentType::GstinCertificate,
            "22ABCDE1234F105"
        ));
    }

    #[test]
    fn empty_number_always_invalid() {
        assert!(!validate_document_number(DocumentType::Selfie, ""));
        assert!(!validate_document_number(DocumentType::PanFront, ""));
    }

    #[test]
    fn unregistered_types_pass_through() {
        assert!(validate_document_number(DocumentType::Selfie, "anything"));
        assert!(validate_document_number(DocumentType::BankStatement, "stmt-2025-01"));
    }

    #[test]
    fn upload_rejects_oversized_file() {
        let err = validate_upload(
            DocumentType::Selfie,
            None,
            MAX_FILE_SIZE + 1,
            "image/jpeg",
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn upload_rejects_disallowed_content_type() {
        let err = validate_upload(DocumentType::Selfie, None, 100, "image/gif").unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedContentType(_)));
    }

    #[test]
    fn upload_accepts_valid_pan() {
        assert!(validate_upload(
            DocumentType::PanFront,
            Some("ABCDE1234F"),
            1024,
            "application/pdf"
        )
        .is_ok());
    }

    #[test]
    fn upload_rejects_bad_number_before_file_checks() {
        let err = validate_upload(
            DocumentType::PanFront,
            Some("ABCDE1234"),
            1024,
            "image/png",
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDocumentNumber { .. }));
    }
}
