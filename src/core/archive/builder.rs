//! Archive builder
//!
//! Turns a finished export document into `exports/<task>.tar.gz`:
//! `archive.json` first, then every referenced image under `images/`.
//!
//! The local backend streams the archive straight to disk. Every other
//! backend stages the JSON as a blob and composes the archive from stored
//! objects, deleting the staged JSON afterwards.

use crate::adapters::storage::{ArchiveEntry, LocalStorage, StorageAdapter};
use crate::domain::document::{image_references, ARCHIVE_JSON_NAME, IMAGES_PREFIX};
use crate::domain::{ArchiveLocation, ExportJob, Result};
use bytes::Bytes;
use std::sync::Arc;

/// Key of the published archive for a task
pub fn archive_key(task: &str) -> String {
    format!("exports/{task}.tar.gz")
}

/// Key the JSON document is staged under before composing
pub fn staging_key(task: &str) -> String {
    format!("exports/{task}/{ARCHIVE_JSON_NAME}")
}

pub struct ArchiveBuilder {
    storage: Arc<dyn StorageAdapter>,
    entry_mtime: u64,
}

impl ArchiveBuilder {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            entry_mtime: 0,
        }
    }

    /// Modification time written into local archive entry headers
    pub fn with_entry_mtime(mut self, mtime: u64) -> Self {
        self.entry_mtime = mtime;
        self
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// Build and publish the archive for `export`, returning where it landed.
    ///
    /// # Errors
    ///
    /// Any missing image or storage failure fails the whole archive; nothing is
    /// published at the archive key in that case.
    pub async fn build(&self, export: &ExportJob) -> Result<ArchiveLocation> {
        let task = export
            .job
            .task_handle
            .as_ref()
            .map(|h| h.as_str().to_string())
            .unwrap_or_else(|| export.id().to_string());
        let key = archive_key(&task);
        let json = Bytes::from(serde_json::to_vec(&export.document)?);
        let images = image_keys(&export.document);

        tracing::info!(
            job_id = %export.id(),
            archive = %key,
            images = images.len(),
            json_bytes = json.len(),
            "Building export archive"
        );

        match self.storage.as_any().downcast_ref::<LocalStorage>() {
            Some(local) => {
                let mut entries = Vec::with_capacity(images.len() + 1);
                entries.push(ArchiveEntry::inline(ARCHIVE_JSON_NAME, json));
                entries.extend(images.iter().map(|k| ArchiveEntry::stored(k.as_str(), k.as_str())));
                local.write_archive(&key, entries, self.entry_mtime).await?;
            }
            None => {
                let staged = staging_key(&task);
                self.storage.write(&staged, json).await?;

                let mut entries = Vec::with_capacity(images.len() + 1);
                entries.push(ArchiveEntry::stored(ARCHIVE_JSON_NAME, staged.as_str()));
                entries.extend(images.iter().map(|k| ArchiveEntry::stored(k.as_str(), k.as_str())));
                let composed = self.storage.compose(&key, &entries).await;

                if let Err(e) = self.storage.delete(&staged).await {
                    tracing::warn!(key = %staged, error = %e, "Failed to delete staged archive JSON");
                }
                composed?;
            }
        }

        let location = self.storage.location_for(&key);
        tracing::info!(job_id = %export.id(), location = %location, "Export archive published");
        Ok(location)
    }
}

/// Image references that live under `images/`; anything else is skipped
fn image_keys(document: &serde_json::Value) -> Vec<String> {
    image_references(document)
        .into_iter()
        .filter(|path| {
            let keep = path.starts_with(IMAGES_PREFIX);
            if !keep {
                tracing::warn!(path = %path, "Skipping image outside images/");
            }
            keep
        })
        .collect()
}
