//! # Compliance Sessions
//!
//! Ephemeral per-actor sessions carried on requests via the
//! `X-Session-Id` header. The compliance gate rejects a session whose
//! last activity exceeds the configured timeout and refreshes the
//! timestamp otherwise. Sessions live in a process-wide `DashMap` —
//! per-key entry locking keeps refreshes atomic without a global lock.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

/// A live session with its activity timestamp.
#[derive(Debug, Clone)]
pub struct ComplianceSession {
    pub actor_id: String,
    pub role: Role,
    pub last_activity: DateTime<Utc>,
}

/// Outcome of a freshness check.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionCheck {
    /// Session fresh; timestamp refreshed; actor and role attached.
    Fresh { actor_id: String, role: Role },
    /// Last activity exceeded the timeout; session removed.
    Expired,
    /// No session under that id.
    Unknown,
}

/// Process-wide session store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, ComplianceSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a session for an actor, returning the session id.
    pub fn issue(&self, actor_id: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            ComplianceSession {
                actor_id: actor_id.to_string(),
                role,
                last_activity: Utc::now(),
            },
        );
        id
    }

    /// Check freshness against the timeout; refresh on success.
    ///
    /// Expired sessions are removed so a stale id cannot be replayed
    /// into a fresh one.
    pub fn check_and_refresh(&self, id: Uuid, timeout: Duration) -> SessionCheck {
        let mut entry = match self.sessions.get_mut(&id) {
            Some(entry) => entry,
            None => return SessionCheck::Unknown,
        };

        let now = Utc::now();
        let idle = now
            .signed_duration_since(entry.last_activity)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if idle > timeout {
            drop(entry);
            self.sessions.remove(&id);
            return SessionCheck::Expired;
        }

        entry.last_activity = now;
        SessionCheck::Fresh {
            actor_id: entry.actor_id.clone(),
            role: entry.role,
        }
    }

    /// Revoke a session. Returns whether one existed.
    pub fn revoke(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Number of live sessions (readiness probe).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Backdate a session's activity timestamp. Test-only control used
    /// to exercise expiry paths without sleeping.
    #[cfg(test)]
    pub fn backdate(&self, id: Uuid, by: Duration) {
        if let Some(mut entry) = self.sessions.get_mut(&id) {
            entry.last_activity = Utc::now()
                - chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        }
    }
}
