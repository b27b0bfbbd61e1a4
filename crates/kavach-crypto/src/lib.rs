//! # kavach-crypto — Field-Level Authenticated Encryption
//!
//! This crate encrypts individual sensitive fields (document numbers,
//! company tax identifiers) for at-rest storage:
//!
//! - **Key providers** abstract where the 256-bit symmetric key comes
//!   from: an environment variable in deployments, an in-memory random
//!   key for tests. Key material is zeroized on drop.
//! - **[`FieldCipher`]** performs AES-256-GCM with a fresh random 16-byte
//!   IV per call and packs `IV ‖ ciphertext ‖ tag` into one base64 token.
//!   Tampered tokens and wrong keys fail loudly at decrypt — never
//!   silently returning corrupted plaintext.
//! - **Write-time integrity**: [`FieldCipher::encrypt_verified`] decrypts
//!   its own output and compares before the caller is allowed to persist.
//!
//! No key generation fallback: a deployment without configured key
//! material fails at startup rather than encrypting with an ephemeral key
//! that would make every stored field unreadable after restart.

pub mod error;
pub mod field_cipher;
pub mod key_provider;

// Re-export primary types.
pub use error::CryptoError;
pub use field_cipher::{FieldCipher, IV_LEN, TAG_LEN};
pub use key_provider::{EnvKeyProvider, FieldKeyProvider, LocalKeyProvider};
