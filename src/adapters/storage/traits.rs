//! Storage abstraction traits
//!
//! Keys are `/`-separated relative names such as `images/covers/1.jpg` or
//! `exports/<task>.tar.gz`. Both backends resolve the same key to the same
//! logical blob.

use crate::config::StorageBackend;
use crate::domain::{ArchiveLocation, Result, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;

/// Where the bytes of one archive entry come from
#[derive(Debug, Clone, PartialEq)]
pub enum EntrySource {
    /// Already in memory
    Inline(Bytes),
    /// A blob held by the same storage backend
    Stored(String),
}

/// One file inside a composed archive
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive
    pub name: String,
    pub source: EntrySource,
}

impl ArchiveEntry {
    pub fn inline(name: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            source: EntrySource::Inline(data),
        }
    }

    pub fn stored(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: EntrySource::Stored(key.into()),
        }
    }
}

/// Uniform blob storage over the local filesystem or remote object storage
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Downcast to Any for backend-specific operations
    ///
    /// The archive builder uses this to reach the local backend's streaming
    /// archive writer.
    fn as_any(&self) -> &dyn Any;

    /// Which backend this adapter talks to
    fn backend(&self) -> StorageBackend;

    /// Reads a whole blob
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the key does not exist.
    async fn read(&self, key: &str) -> Result<Bytes>;

    /// Writes a blob, replacing any existing one
    async fn write(&self, key: &str, data: Bytes) -> Result<()>;

    /// Deletes a blob; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Publishes a gzip-compressed tar at `destination` built from `entries`,
    /// in order.
    ///
    /// Nothing is visible at `destination` unless every entry was written.
    ///
    /// # Errors
    ///
    /// The default implementation reports the operation as unsupported.
    async fn compose(&self, destination: &str, entries: &[ArchiveEntry]) -> Result<()> {
        let _ = entries;
        Err(StorageError::Unsupported(format!(
            "{:?} storage cannot compose {destination}",
            self.backend()
        ))
        .into())
    }

    /// Location recorded on a job for an archive published at `key`
    fn location_for(&self, key: &str) -> ArchiveLocation;
}
