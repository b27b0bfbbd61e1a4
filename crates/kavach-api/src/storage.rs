//! # Object-Storage Collaborator
//!
//! The core treats object storage as a put/sign pair behind a trait.
//! [`InMemoryObjectStore`] backs development and tests; a production S3
//! wiring implements the same trait out of tree. Storage keys are
//! constructed by handlers as `{user_id}_{document_type}_{timestamp_ms}`
//! and passed through the strict storage-key sanitizer first.

use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;

/// Errors from the object-storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal object-storage surface the service depends on.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under a key, returning an opaque locator.
    async fn put(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Produce a time-limited read URL for a stored object.
    async fn signed_read_url(&self, locator: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// In-memory object store for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    bucket: String,
    objects: DashMap<String, (Vec<u8>, String)>,
}

impl InMemoryObjectStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: DashMap::new(),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let locator = format!("mem://{}/document/{key}", self.bucket);
        self.objects
            .insert(locator.clone(), (bytes, content_type.to_string()));
        Ok(locator)
    }

    async fn signed_read_url(&self, locator: &str, ttl: Duration) -> Result<String, StorageError> {
        if !self.objects.contains_key(locator) {
            return Err(StorageError::NotFound(locator.to_string()));
        }
        Ok(format!("{locator}?expires_in={}", ttl.as_secs()))
    }
}
