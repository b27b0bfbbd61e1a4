//! # Key Provider Abstraction
//!
//! Abstracts where the process-wide 256-bit field encryption key comes
//! from, enabling multiple backends:
//!
//! - [`LocalKeyProvider`]: in-memory key for development and testing.
//! - [`EnvKeyProvider`]: loads key material from an environment variable
//!   (hex-encoded 32 bytes). Suitable for container deployments where
//!   secrets are injected via environment. Construction fails when the
//!   variable is unset or malformed — there is deliberately no fallback
//!   to a generated key, which would strand previously encrypted fields
//!   after a restart.
//!
//! ## Security Invariants
//!
//! - Key material is zeroized on drop.
//! - Providers are `Send + Sync`; the key is read-only after startup.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Trait for 256-bit field encryption key backends.
///
/// Implementations must be `Send + Sync`; the cipher holds one provider
/// for the process lifetime and only ever reads from it.
pub trait FieldKeyProvider: Send + Sync {
    /// The 32-byte symmetric key.
    fn key(&self) -> &[u8; 32];

    /// Human-readable name for this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;
}

// ─── LocalKeyProvider ────────────────────────────────────────────────────

/// In-memory key provider for development and testing.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct LocalKeyProvider {
    key: [u8; 32],
}

impl LocalKeyProvider {
    /// Create from an existing 32-byte key.
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Generate a fresh random key using the OS CSPRNG.
    pub fn generate() -> Self {
        use rand_core::{OsRng, RngCore};
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }
}

impl FieldKeyProvider for LocalKeyProvider {
    fn key(&self) -> &[u8; 32] {
        &self.key
    }

    fn provider_name(&self) -> &str {
        "LocalKeyProvider"
    }
}

// ─── EnvKeyProvider ──────────────────────────────────────────────────────

/// Loads the field encryption key from an environment variable.
///
/// The variable must contain a 64-character hex string encoding the
/// 32-byte key. The key is loaded once at construction and held in
/// memory (zeroized on drop).
///
/// ## Example
///
/// ```bash
/// export KAVACH_ENCRYPTION_KEY="deadbeef..."  # 64 hex chars
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EnvKeyProvider {
    key: [u8; 32],
    #[zeroize(skip)]
    var_name: String,
}

impl EnvKeyProvider {
    /// Load the key from the named environment variable.
    ///
    /// Returns [`CryptoError::InvalidKey`] if the variable is not set,
    /// is not valid hex, or does not decode to exactly 32 bytes.
    pub fn from_env(var_name: &str) -> Result<Self, CryptoError> {
        let hex = std::env::var(var_name).map_err(|_| {
            CryptoError::InvalidKey(format!("environment variable {var_name} not set"))
        })?;
        Self::from_hex(&hex, var_name)
    }

    fn from_hex(hex: &str, var_name: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidKey(format!(
                "expected 64 hex characters in {var_name}, got {} characters",
                hex.len()
            )));
        }

        let mut key = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks_exact(2).enumerate() {
            let byte_str = std::str::from_utf8(chunk)
                .map_err(|_| CryptoError::InvalidKey("non-UTF8 hex input".to_string()))?;
            key[i] = u8::from_str_radix(byte_str, 16)
                .map_err(|e| CryptoError::InvalidKey(format!("hex decode error: {e}")))?;
        }

        Ok(Self {
            key,
            var_name: var_name.to_string(),
        })
    }

    /// Return the environment variable name this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl FieldKeyProvider for EnvKeyProvider {
    fn key(&self) -> &[u8; 32] {
        &self.key
    }

    fn provider_name(&self) -> &str {
        "EnvKeyProvider"
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_provider_generates_distinct_keys() {
        let a = LocalKeyProvider::generate();
        let b = LocalKeyProvider::generate();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn local_provider_from_bytes_deterministic() {
        let p = LocalKeyProvider::from_bytes([7u8; 32]);
        assert_eq!(p.key(), &[7u8; 32]);
        assert_eq!(p.provider_name(), "LocalKeyProvider");
    }

    #[test]
    fn env_provider_missing_var() {
        let result = EnvKeyProvider::from_env("KAVACH_TEST_KEY_THAT_DOES_NOT_EXIST_42");
        assert!(result.is_err());
    }

    #[test]
    fn env_provider_loads_valid_hex() {
        let key = [0xab_u8; 32];
        let hex: String = key.iter().map(|b| format!("{b:02x}")).collect();
        let var = "KAVACH_TEST_KEY_PROVIDER_OK";
        std::env::set_var(var, &hex);

        let provider = EnvKeyProvider::from_env(var).expect("from_env");
        assert_eq!(provider.key(), &key);
        assert_eq!(provider.provider_name(), "EnvKeyProvider");
        assert_eq!(provider.var_name(), var);

        std::env::remove_var(var);
    }

    #[test]
    fn env_provider_invalid_hex() {
        let var = "KAVACH_TEST_KEY_PROVIDER_BAD_HEX";
        std::env::set_var(var, "not-valid-hex");
        assert!(EnvKeyProvider::from_env(var).is_err());
        std::env::remove_var(var);
    }

    #[test]
    fn env_provider_wrong_length() {
        let var = "KAVACH_TEST_KEY_PROVIDER_SHORT";
        std::env::set_var(var, "aabbccdd"); // 4 bytes, not 32
        assert!(EnvKeyProvider::from_env(var).is_err());
        std::env::remove_var(var);
    }

    #[test]
    fn provider_trait_object_safe() {
        let provider = LocalKeyProvider::generate();
        let _boxed: Box<dyn FieldKeyProvider> = Box::new(provider);
    }

    #[test]
    fn provider_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LocalKeyProvider>();
        assert_send_sync::<EnvKeyProvider>();
    }
}
