//! Object storage backends
//!
//! The gateway reads and writes opaque blobs keyed by path, each with an
//! optional content type. Two backends implement [`ObjectStore`]:
//! - [`S3ObjectStore`]: any S3-compatible bucket (AWS, R2, MinIO, LocalStack)
//! - [`MemoryObjectStore`]: process-local map for development and tests

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use self::memory::MemoryObjectStore;
pub use self::s3::S3ObjectStore;

/// Errors raised by an object store backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage read failed for {key}: {message}")]
    Read { key: String, message: String },

    #[error("storage write failed for {key}: {message}")]
    Write { key: String, message: String },
}

/// A stored blob and its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn new(body: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            body: body.into(),
            content_type,
        }
    }
}

/// Durable get/put of blobs by key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object; `Ok(None)` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Create or replace an object
    async fn put(&self, key: &str, object: StoredObject) -> Result<(), StorageError>;
}
