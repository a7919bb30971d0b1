//! Job persistence traits
//!
//! The job store is the arena every job lives in. Children reference their
//! parent by id and are found again with [`JobStore::children_of`].
//!
//! Every mutating method is conditional and returns whether it applied.
//! Implementations must evaluate the condition and apply the write as one
//! atomic step; the exactly-once archive trigger relies on
//! [`JobStore::mark_json_completed`] being a true compare-and-set across
//! processes, not just across tasks.

use crate::domain::{
    ArchiveLocation, ChildJob, ExportJob, JobId, JobStatus, Result, TaskHandle, UserId,
};
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Downcast to Any for backend-specific operations
    fn as_any(&self) -> &dyn Any;

    /// Verify the backing store is reachable
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    /// Persist a new root export job
    async fn create_export(&self, export: &ExportJob) -> Result<()>;

    /// Persist a new child job.
    ///
    /// Returns `false` without storing anything when the parent is missing or
    /// already terminal.
    async fn create_child(&self, child: &ChildJob) -> Result<bool>;

    async fn export(&self, id: JobId) -> Result<Option<ExportJob>>;

    async fn child(&self, id: JobId) -> Result<Option<ChildJob>>;

    /// All children of `parent`, oldest first
    async fn children_of(&self, parent: JobId) -> Result<Vec<ChildJob>>;

    /// Root jobs of one user, newest first
    async fn exports_for_user(&self, user: &UserId) -> Result<Vec<ExportJob>>;

    /// Set the status of any job (root or child) if it is not terminal,
    /// refreshing `updated_at`.
    async fn transition(&self, id: JobId, status: JobStatus) -> Result<bool>;

    /// Refresh `updated_at` of a live job
    async fn touch(&self, id: JobId) -> Result<bool>;

    async fn set_task_handle(&self, id: JobId, handle: &TaskHandle) -> Result<bool>;

    /// Replace the whole export document of a live root job
    async fn set_document(&self, id: JobId, document: &Value) -> Result<bool>;

    /// Replace one top-level key of a live root job's document
    async fn set_document_key(&self, id: JobId, key: &str, value: &Value) -> Result<bool>;

    /// Atomically append `entry`, written by child `writer`, to the
    /// document's `books` list.
    ///
    /// At most one entry per writer is ever appended; a repeated call for the
    /// same writer returns `false` and leaves the document unchanged.
    async fn append_book(&self, id: JobId, writer: JobId, entry: &Value) -> Result<bool>;

    /// Compare-and-set `json_completed` from false to true on a live root job.
    ///
    /// Exactly one caller observes `true`.
    async fn mark_json_completed(&self, id: JobId) -> Result<bool>;

    /// Record the archive location once, on a live root job
    async fn set_archive_location(&self, id: JobId, location: &ArchiveLocation) -> Result<bool>;
}
