//! # Audit Trail
//!
//! Best-effort audit logging: every compliance-relevant action is
//! recorded with actor, action tag, sanitized details, request origin,
//! and a server-derived severity. Failures to persist an entry are
//! logged and swallowed — audit must never take down the request that
//! triggered it.
//!
//! Entries always land in the in-memory ring; when a Postgres pool is
//! configured a copy is written through asynchronously.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use kavach_core::{classify_severity, sanitize, sanitize_storage_key, AuditSeverity};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Reads return at most this many entries, newest first.
pub const MAX_QUERY_RESULTS: usize = 100;

/// Ring capacity. The in-memory trail keeps the most recent entries
/// only; the Postgres write-through is the durable record.
pub const MAX_RETAINED_ENTRIES: usize = 10_000;

/// One audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditLogEntry {
    pub id: Uuid,
    /// Acting user, absent for pre-auth rejections.
    pub user_id: Option<String>,
    /// SCREAMING_SNAKE action tag, e.g. `DOCUMENT_UPLOAD`.
    pub action: String,
    pub severity: AuditSeverity,
    /// Sanitized free-form details.
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Filters for audit trail reads. Values pass through the strict
/// storage-key sanitizer before matching.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuditFilter {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub severity: Option<AuditSeverity>,
}

/// Request origin captured alongside each entry.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Process-wide audit sink with optional Postgres write-through.
pub struct AuditLogger {
    entries: RwLock<VecDeque<AuditLogEntry>>,
    pool: Option<sqlx::PgPool>,
}

impl AuditLogger {
    pub fn new(pool: Option<sqlx::PgPool>) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            pool,
        }
    }

    /// Record an action. Details are sanitized before storage; severity
    /// is derived from the action tag, never caller-supplied.
    pub fn record(
        &self,
        user_id: Option<&str>,
        action: &str,
        details: serde_json::Value,
        origin: &RequestOrigin,
    ) -> AuditLogEntry {
        // A detail payload deeper than the sanitizer bound is itself
        // suspicious; record that instead of the payload.
        let details = sanitize(&details).unwrap_or_else(|err| {
            serde_json::json!({ "sanitizer": err.to_string() })
        });

        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            user_id: user_id.map(str::to_string),
            action: action.to_string(),
            severity: classify_severity(action),
            details,
            ip_address: origin.ip_address.clone(),
            user_agent: origin.user_agent.clone(),
            timestamp: Utc::now(),
        };

        {
            let mut entries = self.entries.write();
            entries.push_back(entry.clone());
            while entries.len() > MAX_RETAINED_ENTRIES {
                entries.pop_front();
            }
        }

        if let Some(pool) = &self.pool {
            let pool = pool.clone();
            let row = entry.clone();
            tokio::spawn(async move {
                if let Err(err) = crate::db::audit::insert(&pool, &row).await {
                    tracing::error!(error = %err, action = %row.action, "audit write-through failed");
                }
            });
        }

        entry
    }

    /// Query the trail, newest first, capped at [`MAX_QUERY_RESULTS`].
    pub fn query(&self, filter: &AuditFilter) -> Vec<AuditLogEntry> {
        let user_id = filter.user_id.as_deref().map(sanitize_storage_key);
        let action = filter.action.as_deref().map(sanitize_storage_key);

        let entries = self.entries.read();
        let mut matched: Vec<AuditLogEntry> = entries
            .iter()
            .filter(|e| match (&user_id, &e.user_id) {
                (Some(want), Some(have)) => want == have,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|e| action.as_deref().map_or(true, |want| e.action == want))
            .filter(|e| filter.severity.map_or(true, |want| e.severity == want))
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(MAX_QUERY_RESULTS);
        matched
    }

    /// Total entries held in memory (readiness probe and metrics).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
