//! # Audit Severity Classification
//!
//! One canonical mapping from action name to severity, used by every
//! audit write in the service. Severity is derived server-side — it is
//! never client-supplied.
//!
//! Classification order:
//! 1. Suffix rule: `_ERROR` / `_FAILURE` ⇒ Error, `_WARNING` ⇒ Warning.
//! 2. Canonical table lookup for security-classified actions.
//! 3. Default: Info.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Severity of an audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INFO" => Some(Self::Info),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical action → severity table for actions whose severity is not
/// expressed by a suffix. Security-classified rejections are CRITICAL.
const SEVERITY_TABLE: [(&str, AuditSeverity); 6] = [
    ("SECURITY_ERROR", AuditSeverity::Critical),
    ("SESSION_EXPIRED", AuditSeverity::Critical),
    ("AUTH_REJECTED", AuditSeverity::Critical),
    ("ACCESS_DENIED", AuditSeverity::Critical),
    ("RATE_LIMIT_EXCEEDED", AuditSeverity::Warning),
    ("DOCUMENT_POLICY_REJECTED", AuditSeverity::Warning),
];

/// Derive the severity for an action tag.
pub fn classify_severity(action: &str) -> AuditSeverity {
    if action.ends_with("_ERROR") || action.ends_with("_FAILURE") {
        // Suffix rule wins, except for actions pinned CRITICAL in the table.
        if let Some((_, sev)) = SEVERITY_TABLE.iter().find(|(a, _)| *a == action) {
            return *sev;
        }
        return AuditSeverity::Error;
    }
    if action.ends_with("_WARNING") {
        return AuditSeverity::Warning;
    }
    SEVERITY_TABLE
        .iter()
        .find(|(a, _)| *a == action)
        .map(|(_, sev)| *sev)
        .unwrap_or(AuditSeverity::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_suffix_classifies_as_error() {
        assert_eq!(
            classify_severity("DOCUMENT_UPLOAD_ERROR"),
            AuditSeverity::Error
        );
        assert_eq!(classify_severity("VERIFY_FAILURE"), AuditSeverity::Error);
    }

    #[test]
    fn warning_suffix_classifies_as_warning() {
        assert_eq!(classify_severity("QUOTA_WARNING"), AuditSeverity::Warning);
    }

    #[test]
    fn table_actions_resolve() {
        assert_eq!(classify_severity("SESSION_EXPIRED"), AuditSeverity::Critical);
        assert_eq!(classify_severity("ACCESS_DENIED"), AuditSeverity::Critical);
        assert_eq!(
            classify_severity("RATE_LIMIT_EXCEEDED"),
            AuditSeverity::Warning
        );
    }

    #[test]
    fn security_error_stays_critical_despite_suffix() {
        assert_eq!(classify_severity("SECURITY_ERROR"), AuditSeverity::Critical);
    }

    #[test]
    fn plain_actions_default_to_info() {
        assert_eq!(classify_severity("DOCUMENT_UPLOAD"), AuditSeverity::Info);
        assert_eq!(classify_severity("FOO"), AuditSeverity::Info);
    }

    #[test]
    fn severity_round_trips() {
        for sev in [
            AuditSeverity::Info,
            AuditSeverity::Warning,
            AuditSeverity::Error,
            AuditSeverity::Critical,
        ] {
            assert_eq!(AuditSeverity::parse(sev.as_str()), Some(sev));
        }
    }
}
