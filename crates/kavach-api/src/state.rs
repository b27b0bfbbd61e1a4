//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState holds the service's own concerns only:
//! - **Documents** — KYC document records with encrypted number tokens
//! - **Professions** — profile submissions, one per user
//! - **Sessions** — compliance session store consulted by the gate
//! - **Audit** — best-effort audit sink with optional Postgres write-through
//! - **Collaborators** — object store and verification provider behind traits
//!
//! Document bytes never live here — they go straight to the object
//! store, and only the opaque locator is retained.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use kavach_core::{KycDocument, UserProfession};
use kavach_crypto::{FieldCipher, LocalKeyProvider};
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::AuditLogger;
use crate::config::AppConfig;
use crate::middleware::shield::RateLimiter;
use crate::session::SessionStore;
use crate::storage::{InMemoryObjectStore, ObjectStore};
use crate::verifier::{DocumentVerifier, StaticVerifier};

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable — a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct Store<K: Eq + Hash + Clone, T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K: Eq + Hash + Clone, T: Clone + Send + Sync> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Clone, T: Clone + Send + Sync> Store<K, T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: K, value: T) -> Option<T> {
        self.data.write().insert(key, value)
    }

    /// Retrieve a record by key.
    pub fn get(&self, key: &K) -> Option<T> {
        self.data.read().get(key).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// List records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data.read().values().filter(|t| pred(t)).cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None`
    /// if not found.
    pub fn update(&self, key: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(key) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure may inspect current state, validate preconditions,
    /// mutate, and return `Ok(R)` or `Err(E)` — all under a single write
    /// lock, eliminating TOCTOU races between read and update.
    ///
    /// Returns `None` if the record doesn't exist.
    pub fn try_update<R, E>(
        &self,
        key: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(key).map(f)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, T: Clone + Send + Sync> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- AppState -----------------------------------------------------------------

/// Shared application state. Cheap to clone: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Field cipher for document numbers and GSTINs.
    pub cipher: FieldCipher,
    /// KYC document records by id.
    pub documents: Store<Uuid, KycDocument>,
    /// Profession records by user id (one per user, latest wins).
    pub professions: Store<String, UserProfession>,
    pub sessions: Arc<SessionStore>,
    pub audit: Arc<AuditLogger>,
    pub limiter: Arc<RateLimiter>,
    pub object_store: Arc<dyn ObjectStore>,
    pub verifier: Arc<dyn DocumentVerifier>,
    /// Postgres pool, `None` in in-memory-only mode.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Assemble state from externally constructed collaborators. Key
    /// provider, object store, and verifier are injected — the state
    /// never reaches into the environment itself.
    pub fn new(
        config: AppConfig,
        cipher: FieldCipher,
        object_store: Arc<dyn ObjectStore>,
        verifier: Arc<dyn DocumentVerifier>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max,
            config.rate_limit_window,
        ));
        Self {
            config: Arc::new(config),
            cipher,
            documents: Store::new(),
            professions: Store::new(),
            sessions: Arc::new(SessionStore::new()),
            audit: Arc::new(AuditLogger::new(db_pool.clone())),
            limiter,
            object_store,
            verifier,
            db_pool,
        }
    }

    /// State for tests: generated key, in-memory collaborators, an
    /// always-verifying provider, no database.
    pub fn for_tests() -> Self {
        let config = AppConfig::for_tests();
        let cipher = FieldCipher::new(Arc::new(LocalKeyProvider::generate()));
        Self::new(
            config,
            cipher,
            Arc::new(InMemoryObjectStore::new("kavach-test")),
            Arc::new(StaticVerifier::verified()),
            None,
        )
    }

    /// Like [`for_tests`](Self::for_tests) but with an always-rejecting
    /// verification provider.
    pub fn for_tests_rejecting() -> Self {
        let config = AppConfig::for_tests();
        let cipher = FieldCipher::new(Arc::new(LocalKeyProvider::generate()));
        Self::new(
            config,
            cipher,
            Arc::new(InMemoryObjectStore::new("kavach-test")),
            Arc::new(StaticVerifier::rejected()),
            None,
        )
    }
}
