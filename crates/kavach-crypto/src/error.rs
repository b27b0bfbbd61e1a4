//! # Cryptographic Error Types
//!
//! Structured errors for field encryption. The API layer maps these to
//! generic client-facing messages — cryptographic internals never reach
//! a response body.

use thiserror::Error;

/// Errors from field encryption operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Encryption failed (cipher-level failure, should not occur with a
    /// well-formed key).
    #[error("field encryption failed")]
    Encryption,

    /// Authentication tag did not verify: tampered token or wrong key.
    #[error("field decryption failed: authentication error")]
    Decryption,

    /// Token is not valid base64 or is too short to contain IV and tag.
    #[error("malformed encrypted token: {0}")]
    MalformedToken(String),

    /// Write-time round-trip verification produced a mismatch.
    #[error("encryption integrity check failed")]
    IntegrityCheck,

    /// Key material missing or malformed at startup.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),
}
