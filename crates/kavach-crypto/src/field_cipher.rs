//! # Field Cipher
//!
//! AES-256-GCM encryption of individual sensitive fields. Each call uses
//! a fresh random 16-byte IV; the resulting token is
//! `base64(IV ‖ ciphertext ‖ tag)` with fixed 16-byte IV and tag
//! segments. Decryption authenticates the tag — a tampered token or a
//! wrong key is a loud [`CryptoError::Decryption`], never silently
//! corrupted plaintext.

use std::sync::Arc;

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand_core::{OsRng, RngCore};

use crate::error::CryptoError;
use crate::key_provider::FieldKeyProvider;

/// IV segment length in the packed token.
pub const IV_LEN: usize = 16;

/// Authentication tag segment length in the packed token.
pub const TAG_LEN: usize = 16;

/// AES-256-GCM parameterized with the 16-byte IV the token format uses.
type Cipher = AesGcm<Aes256, U16>;

/// Process-wide field cipher, constructed once at startup from an
/// injected key provider.
#[derive(Clone)]
pub struct FieldCipher {
    provider: Arc<dyn FieldKeyProvider>,
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl FieldCipher {
    /// Create a cipher over the given key provider.
    pub fn new(provider: Arc<dyn FieldKeyProvider>) -> Self {
        Self { provider }
    }

    /// Encrypt a field value into an opaque token.
    ///
    /// `None` and empty strings map to `None` — empty values are never
    /// encrypted.
    pub fn encrypt(&self, plaintext: Option<&str>) -> Result<Option<String>, CryptoError> {
        let plaintext = match plaintext {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(None),
        };

        let cipher = Cipher::new(GenericArray::from_slice(self.provider.key()));

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext_and_tag = cipher
            .encrypt(GenericArray::from_slice(&iv), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encryption)?;

        // Token layout: IV ‖ ciphertext ‖ tag. The AEAD already appends
        // the tag to the ciphertext.
        let mut combined = Vec::with_capacity(IV_LEN + ciphertext_and_tag.len());
        combined.extend_from_slice(&iv);
        combined.extend_from_slice(&ciphertext_and_tag);

        Ok(Some(BASE64.encode(combined)))
    }

    /// Decrypt a token produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails with [`CryptoError::Decryption`] when the authentication tag
    /// does not verify (tamper or wrong key).
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let combined = BASE64
            .decode(token)
            .map_err(|e| CryptoError::MalformedToken(format!("invalid base64: {e}")))?;

        if combined.len() < IV_LEN + TAG_LEN {
            return Err(CryptoError::MalformedToken(format!(
                "token too short: {} bytes",
                combined.len()
            )));
        }

        let (iv, ciphertext_and_tag) = combined.split_at(IV_LEN);
        let cipher = Cipher::new(GenericArray::from_slice(self.provider.key()));

        let plaintext = cipher
            .decrypt(GenericArray::from_slice(iv), ciphertext_and_tag)
            .map_err(|_| CryptoError::Decryption)?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::MalformedToken("plaintext is not UTF-8".to_string()))
    }

    /// Encrypt with a write-time integrity check: the token is decrypted
    /// and compared against the input before being handed back. A
    /// mismatch is [`CryptoError::IntegrityCheck`] — the caller must
    /// abort the write rather than persist bad data.
    pub fn encrypt_verified(&self, plaintext: Option<&str>) -> Result<Option<String>, CryptoError> {
        let token = match self.encrypt(plaintext)? {
            Some(token) => token,
            None => return Ok(None),
        };

        let round_trip = self.decrypt(&token).map_err(|_| CryptoError::IntegrityCheck)?;
        if Some(round_trip.as_str()) != plaintext {
            return Err(CryptoError::IntegrityCheck);
        }

        Ok(Some(token))
    }
}
