//! Local filesystem storage

use super::archive::ArchiveWriter;
use super::traits::{ArchiveEntry, EntrySource, StorageAdapter};
use crate::config::{LocalStorageConfig, StorageBackend};
use crate::domain::{ArchiveLocation, Result, ShelfpackError, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

/// Suffix of an archive that is still being written
const PARTIAL_SUFFIX: &str = ".partial";

/// Blob storage rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Creates the adapter, creating `root` if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn new(config: &LocalStorageConfig) -> Result<Self> {
        Self::with_root(&config.root)
    }

    pub fn with_root(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| {
            ShelfpackError::Configuration(format!(
                "Failed to create storage root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to a path under the root
    ///
    /// # Errors
    ///
    /// Rejects empty keys, absolute keys and any `.`/`..` component.
    pub fn resolve(&self, key: &str) -> Result<PathBuf> {
        resolve_under(&self.root, key)
    }

    /// Streams an archive straight to disk.
    ///
    /// Entries are written one by one into `<destination>.partial`, stored
    /// entries are copied from their files without buffering them whole, and
    /// the partial file is renamed into place only after the gzip stream is
    /// finished. On failure the partial file is removed.
    ///
    /// Runs on the blocking thread pool.
    pub async fn write_archive(
        &self,
        destination: &str,
        entries: Vec<ArchiveEntry>,
        mtime: u64,
    ) -> Result<PathBuf> {
        let root = self.root.clone();
        let final_path = self.resolve(destination)?;

        tokio::task::spawn_blocking(move || {
            let partial = partial_path(&final_path);
            let outcome = write_archive_blocking(&root, &partial, &entries, mtime)
                .and_then(|_| std::fs::rename(&partial, &final_path).map_err(Into::into));

            match outcome {
                Ok(()) => Ok(final_path),
                Err(e) => {
                    let _ = std::fs::remove_file(&partial);
                    Err(e)
                }
            }
        })
        .await
        .map_err(|e| ShelfpackError::Archive(format!("Archive writer task failed: {e}")))?
    }
}

fn resolve_under(root: &Path, key: &str) -> Result<PathBuf> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()).into());
    }
    let relative = Path::new(key);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(StorageError::InvalidKey(key.to_string()).into());
    }
    Ok(root.join(relative))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn not_found_or_io(key: &str, err: std::io::Error) -> ShelfpackError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string()).into()
    } else {
        StorageError::Backend(format!("{key}: {err}")).into()
    }
}

fn write_archive_blocking(
    root: &Path,
    partial: &Path,
    entries: &[ArchiveEntry],
    mtime: u64,
) -> Result<()> {
    if let Some(parent) = partial.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(partial)?;
    let mut writer = ArchiveWriter::new(BufWriter::new(file), mtime);

    for entry in entries {
        match &entry.source {
            EntrySource::Inline(data) => {
                writer.append(&entry.name, data.len() as u64, data.as_ref())?;
            }
            EntrySource::Stored(key) => {
                let path = resolve_under(root, key)?;
                let source = File::open(&path).map_err(|e| not_found_or_io(key, e))?;
                let size = source.metadata()?.len();
                writer.append(&entry.name, size, source)?;
            }
        }
    }

    let mut out = writer.finish()?;
    out.flush()?;
    out.into_inner()
        .map_err(|e| ShelfpackError::Io(e.to_string()))?
        .sync_all()?;
    Ok(())
}

#[async_trait]
impl StorageAdapter for LocalStorage {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn read(&self, key: &str) -> Result<Bytes> {
        let path = self.resolve(key)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        tracing::debug!(key = %key, bytes = data.len(), "Wrote local object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(not_found_or_io(key, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn location_for(&self, key: &str) -> ArchiveLocation {
        let path = self.root.join(key);
        ArchiveLocation::LocalPath(path.to_string_lossy().to_string())
    }
}
