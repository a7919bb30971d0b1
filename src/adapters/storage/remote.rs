//! Remote object storage backed by `object_store`

use super::archive::ArchiveWriter;
use super::traits::{ArchiveEntry, EntrySource, StorageAdapter};
use crate::config::{S3StorageConfig, StorageBackend};
use crate::domain::{ArchiveLocation, Result, ShelfpackError, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, WriteMultipart};
use secrecy::ExposeSecret;
use std::any::Any;
use std::sync::Arc;

const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Blob storage over any `ObjectStore` (S3 in production)
#[derive(Debug, Clone)]
pub struct RemoteStorage {
    store: Arc<dyn ObjectStore>,
    chunk_size: usize,
    max_concurrency: usize,
    mtime: u64,
}

impl RemoteStorage {
    /// Wraps an existing store, e.g. `object_store::memory::InMemory` in tests
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            mtime: 0,
        }
    }

    /// Builds an S3 client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`ShelfpackError::Configuration`] if the builder rejects the settings.
    pub fn from_s3_config(config: &S3StorageConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        if let Some(endpoint) = &config.endpoint {
            // Path-style requests for S3-compatible endpoints
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }
        if let Some(key_id) = &config.access_key_id {
            builder = builder.with_access_key_id(key_id);
        }
        if let Some(secret) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret.expose_secret().as_ref());
        }

        let store = builder
            .build()
            .map_err(|e| ShelfpackError::Configuration(format!("S3: {e}")))?;

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "Created S3 storage client"
        );

        Ok(Self::new(Arc::new(store))
            .with_chunk_size(config.chunk_size_bytes())
            .with_max_concurrency(config.max_concurrency))
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Modification time stamped on every composed entry
    pub fn with_entry_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    async fn compose_into(
        &self,
        upload: &mut WriteMultipart,
        entries: &[ArchiveEntry],
    ) -> Result<()> {
        let mut writer = ArchiveWriter::new(Vec::new(), self.mtime);

        for entry in entries {
            let data = match &entry.source {
                EntrySource::Inline(data) => data.clone(),
                EntrySource::Stored(key) => self.read(key).await?,
            };
            writer.append(&entry.name, data.len() as u64, data.as_ref())?;

            let chunk = writer.take_output();
            if !chunk.is_empty() {
                upload
                    .wait_for_capacity(self.max_concurrency)
                    .await
                    .map_err(StorageError::from)?;
                upload.write(&chunk);
            }
        }

        let tail = writer.finish()?;
        upload.write(&tail);
        Ok(())
    }
}

fn object_path(key: &str) -> Result<ObjectPath> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()).into());
    }
    ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey(format!("{key}: {e}")).into())
}

#[async_trait]
impl StorageAdapter for RemoteStorage {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::S3
    }

    async fn read(&self, key: &str) -> Result<Bytes> {
        let path = object_path(key)?;
        let result = self.store.get(&path).await.map_err(StorageError::from)?;
        let bytes = result.bytes().await.map_err(StorageError::from)?;
        Ok(bytes)
    }

    async fn write(&self, key: &str, data: Bytes) -> Result<()> {
        let path = object_path(key)?;
        let len = data.len();
        self.store
            .put(&path, data.into())
            .await
            .map_err(StorageError::from)?;
        tracing::debug!(key = %key, bytes = len, "Wrote remote object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = object_path(key)?;
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::from(e).into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = object_path(key)?;
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::from(e).into()),
        }
    }

    /// Streams the entries through a tar/gzip encoder into a multipart
    /// upload. The upload is aborted on any error, so a failed compose never
    /// leaves an object at `destination`.
    async fn compose(&self, destination: &str, entries: &[ArchiveEntry]) -> Result<()> {
        let path = object_path(destination)?;
        let multipart = self
            .store
            .put_multipart(&path)
            .await
            .map_err(StorageError::from)?;
        let mut upload = WriteMultipart::new_with_chunk_size(multipart, self.chunk_size);

        match self.compose_into(&mut upload, entries).await {
            Ok(()) => {
                upload.finish().await.map_err(StorageError::from)?;
                tracing::info!(
                    destination = %destination,
                    entries = entries.len(),
                    "Composed remote archive"
                );
                Ok(())
            }
            Err(e) => {
                if let Err(abort_err) = upload.abort().await {
                    tracing::warn!(
                        destination = %destination,
                        error = %abort_err,
                        "Failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    fn location_for(&self, key: &str) -> ArchiveLocation {
        ArchiveLocation::RemoteKey(key.to_string())
    }
}
