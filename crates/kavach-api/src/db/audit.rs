//! Audit trail persistence operations.
//!
//! Entries are immutable once written — there are no update or delete
//! operations. Retention is an external archival concern.

use chrono::{DateTime, Utc};
use kavach_core::AuditSeverity;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{AuditFilter, AuditLogEntry, MAX_QUERY_RESULTS};

/// Insert an audit entry.
pub async fn insert(pool: &PgPool, entry: &AuditLogEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_log (id, user_id, action, severity, details,
         ip_address, user_agent, timestamp)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(entry.id)
    .bind(&entry.user_id)
    .bind(&entry.action)
    .bind(entry.severity.as_str())
    .bind(&entry.details)
    .bind(&entry.ip_address)
    .bind(&entry.user_agent)
    .bind(entry.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// Query the persisted trail, newest first, capped at
/// [`MAX_QUERY_RESULTS`]. Filter values are already sanitized by the
/// caller; binding keeps them data either way.
pub async fn query(pool: &PgPool, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AuditRow>(
        "SELECT id, user_id, action, severity, details, ip_address, user_agent, timestamp
         FROM audit_log
         WHERE ($1::text IS NULL OR user_id = $1)
           AND ($2::text IS NULL OR action = $2)
           AND ($3::text IS NULL OR severity = $3)
         ORDER BY timestamp DESC
         LIMIT $4",
    )
    .bind(&filter.user_id)
    .bind(&filter.action)
    .bind(filter.severity.map(|s| s.as_str()))
    .bind(MAX_QUERY_RESULTS as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(AuditRow::into_entry).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    user_id: Option<String>,
    action: String,
    severity: String,
    details: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    timestamp: DateTime<Utc>,
}

impl AuditRow {
    fn into_entry(self) -> Option<AuditLogEntry> {
        let severity = match AuditSeverity::parse(&self.severity) {
            Some(s) => s,
            None => {
                tracing::warn!(
                    id = %self.id,
                    severity = %self.severity,
                    "unknown severity in database — skipping row"
                );
                return None;
            }
        };

        Some(AuditLogEntry {
            id: self.id,
            user_id: self.user_id,
            action: self.action,
            severity,
            details: self.details,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            timestamp: self.timestamp,
        })
    }
}
