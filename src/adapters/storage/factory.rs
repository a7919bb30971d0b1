//! Storage adapter factory

use super::local::LocalStorage;
use super::remote::RemoteStorage;
use super::traits::StorageAdapter;
use crate::config::{StorageBackend, StorageConfig};
use crate::domain::{Result, ShelfpackError};
use std::sync::Arc;

/// Create the process-wide storage adapter
///
/// # Errors
///
/// Returns an error if the selected backend is missing its section or cannot
/// be initialised.
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn StorageAdapter>> {
    match config.backend {
        StorageBackend::Local => {
            tracing::info!(root = %config.local.root, "Creating local storage");
            Ok(Arc::new(LocalStorage::new(&config.local)?))
        }
        StorageBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or_else(|| {
                ShelfpackError::Configuration(
                    "storage.s3 configuration is required when storage.backend = 's3'".to_string(),
                )
            })?;
            tracing::info!(bucket = %s3.bucket, "Creating S3 storage");
            Ok(Arc::new(RemoteStorage::from_s3_config(s3)?))
        }
    }
}
