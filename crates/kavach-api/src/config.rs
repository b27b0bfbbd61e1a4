//! # Service Configuration
//!
//! Environment-driven configuration, loaded and validated once at
//! startup. Startup fails on a missing or malformed encryption key and
//! on a CORS allow-list that combines a wildcard origin with
//! credentials — both are deployment mistakes that must not be papered
//! over at runtime.
//!
//! | Variable                   | Meaning                                | Default        |
//! |----------------------------|----------------------------------------|----------------|
//! | `KAVACH_ENCRYPTION_KEY`    | 64-hex-char field encryption key       | **required**   |
//! | `KAVACH_SESSION_TIMEOUT_SECS` | Session inactivity ceiling          | 900 (15 min)   |
//! | `KAVACH_RATE_LIMIT_WINDOW_SECS` | Rate limit window               | 900 (15 min)   |
//! | `KAVACH_RATE_LIMIT_MAX`    | Requests per key per window            | 100            |
//! | `KAVACH_ALLOWED_ORIGINS`   | Comma-separated CORS allow-list        | localhost:3000 |
//! | `KAVACH_AUDIT_RETENTION_DAYS` | Advisory retention window (days)    | 365            |
//! | `KAVACH_ADMIN_KEY`         | Key granting admin sessions            | unset          |
//! | `KAVACH_PROVIDER_URL`      | Verification provider base URL         | unset          |
//! | `KAVACH_PROVIDER_API_KEY`  | Verification provider bearer key       | unset          |
//! | `KAVACH_BUCKET`            | Object-storage bucket name             | kavach-documents |
//! | `DATABASE_URL`             | Postgres URL (in-memory mode if unset) | unset          |
//! | `KAVACH_LISTEN_ADDR`       | Bind address                           | 0.0.0.0:4000   |

use std::time::Duration;

use thiserror::Error;

/// Errors from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("encryption key error: {0}")]
    EncryptionKey(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("CORS allow-list must not contain a wildcard origin when credentials are permitted")]
    WildcardCorsOrigin,
}

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Inactivity ceiling after which a session is expired.
    pub session_timeout: Duration,
    /// Rate limit window length.
    pub rate_limit_window: Duration,
    /// Requests allowed per client key per window.
    pub rate_limit_max: u32,
    /// Explicit CORS allow-list. Never a wildcard.
    pub allowed_origins: Vec<String>,
    /// Advisory audit retention window in days. Enforcement is an
    /// external archival concern.
    pub audit_retention_days: u32,
    /// Key granting admin role at session issuance, when configured.
    pub admin_key: Option<String>,
    /// Verification provider base URL, when configured.
    pub provider_url: Option<String>,
    /// Verification provider API key.
    pub provider_api_key: Option<String>,
    /// Object-storage bucket name.
    pub bucket: String,
    /// Bind address for the HTTP listener.
    pub listen_addr: String,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// Does not load the encryption key itself — key material goes
    /// straight from [`kavach_crypto::EnvKeyProvider`] into the cipher —
    /// but verifies it is present so startup fails early.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Fail fast when the key is missing. No ephemeral fallback:
        // a generated key would strand every stored field on restart.
        kavach_crypto::EnvKeyProvider::from_env("KAVACH_ENCRYPTION_KEY")
            .map_err(|e| ConfigError::EncryptionKey(e.to_string()))?;

        let config = Self {
            session_timeout: Duration::from_secs(env_u64("KAVACH_SESSION_TIMEOUT_SECS", 900)?),
            rate_limit_window: Duration::from_secs(env_u64(
                "KAVACH_RATE_LIMIT_WINDOW_SECS",
                900,
            )?),
            rate_limit_max: env_u64("KAVACH_RATE_LIMIT_MAX", 100)? as u32,
            allowed_origins: env_list(
                "KAVACH_ALLOWED_ORIGINS",
                &["http://localhost:3000"],
            ),
            audit_retention_days: env_u64("KAVACH_AUDIT_RETENTION_DAYS", 365)? as u32,
            admin_key: std::env::var("KAVACH_ADMIN_KEY").ok().filter(|v| !v.is_empty()),
            provider_url: std::env::var("KAVACH_PROVIDER_URL").ok().filter(|v| !v.is_empty()),
            provider_api_key: std::env::var("KAVACH_PROVIDER_API_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
            bucket: std::env::var("KAVACH_BUCKET")
                .unwrap_or_else(|_| "kavach-documents".to_string()),
            listen_addr: std::env::var("KAVACH_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:4000".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::WildcardCorsOrigin);
        }
        if self.rate_limit_max == 0 {
            return Err(ConfigError::InvalidValue {
                var: "KAVACH_RATE_LIMIT_MAX",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration for tests: short windows, no external collaborators.
    pub fn for_tests() -> Self {
        Self {
            session_timeout: Duration::from_secs(900),
            rate_limit_window: Duration::from_secs(900),
            rate_limit_max: 100,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            audit_retention_days: 365,
            admin_key: Some("test-admin-key".to_string()),
            provider_url: None,
            provider_api_key: None,
            bucket: "kavach-test".to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
        }
    }
}

fn env_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var,
            reason: format!("expected an integer, got {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

fn env_list(var: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(var) {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_origin_rejected() {
        let mut config = AppConfig::for_tests();
        config.allowed_origins = vec!["*".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WildcardCorsOrigin)
        ));
    }

    #[test]
    fn zero_rate_limit_rejected() {
        let mut config = AppConfig::for_tests();
        config.rate_limit_max = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_is_valid() {
        assert!(AppConfig::for_tests().validate().is_ok());
    }

    #[test]
    fn from_env_fails_without_encryption_key() {
        std::env::remove_var("KAVACH_ENCRYPTION_KEY");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::EncryptionKey(_))));
    }
}
