//! # Domain Validation Errors
//!
//! Structured errors for user-correctable input problems. The API layer
//! maps these to 400-class responses with a stable machine-readable reason.

use thiserror::Error;

/// Errors from domain validation of inbound KYC data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Document type is not a member of the closed enum.
    #[error("invalid document type: {0}")]
    InvalidDocumentType(String),

    /// Document number failed its registered format pattern.
    #[error("invalid document number format for {document_type}")]
    InvalidDocumentNumber { document_type: String },

    /// Document number is missing where one is required.
    #[error("document number must not be empty")]
    EmptyDocumentNumber,

    /// Uploaded file exceeds the size ceiling.
    #[error("file size {size} exceeds the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },

    /// Uploaded file content type is not in the allow-list.
    #[error("unsupported file content type: {0}")]
    UnsupportedContentType(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_field_context() {
        let err = ValidationError::InvalidDocumentNumber {
            document_type: "PAN_FRONT".into(),
        };
        assert!(err.to_string().contains("PAN_FRONT"));

        let err = ValidationError::FileTooLarge {
            size: 6_000_000,
            limit: 5_242_880,
        };
        assert!(err.to_string().contains("6000000"));
    }
}
