//! Job manager
//!
//! Wraps the job store with lookups that fail on unknown ids and with
//! transition helpers that log every applied status change.

use crate::adapters::jobstore::JobStore;
use crate::domain::{
    ChildJob, ChildKind, ExportJob, JobId, JobStatus, Result, ShelfpackError, StopReason,
    TaskHandle, UserId,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct JobManager {
    store: Arc<dyn JobStore>,
}

impl JobManager {
    /// Create a new JobManager over a job store backend
    pub fn new_with_store(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Create and persist a pending root job for `user`
    pub async fn create_export(&self, user: UserId) -> Result<ExportJob> {
        let export = ExportJob::new(user);
        self.store.create_export(&export).await?;
        crate::log_job_transition!(export.id(), export.job.status);
        Ok(export)
    }

    /// Create and persist a pending child of `parent`.
    ///
    /// Returns `None` when the parent is missing or already terminal.
    pub async fn create_child(&self, parent: JobId, kind: ChildKind) -> Result<Option<ChildJob>> {
        let child = ChildJob::new(parent, kind);
        if !self.store.create_child(&child).await? {
            tracing::debug!(
                parent_id = %parent,
                kind = child.kind.tag(),
                "Parent is not live, child not created"
            );
            return Ok(None);
        }
        tracing::debug!(
            parent_id = %parent,
            child_id = %child.id(),
            kind = child.kind.tag(),
            "Child job created"
        );
        Ok(Some(child))
    }

    /// Load a root job
    ///
    /// # Errors
    ///
    /// Returns [`ShelfpackError::JobNotFound`] if no root job has this id.
    pub async fn export(&self, id: JobId) -> Result<ExportJob> {
        self.store
            .export(id)
            .await?
            .ok_or_else(|| ShelfpackError::JobNotFound(id.to_string()))
    }

    /// Load a child job
    ///
    /// # Errors
    ///
    /// Returns [`ShelfpackError::JobNotFound`] if no child job has this id.
    pub async fn child(&self, id: JobId) -> Result<ChildJob> {
        self.store
            .child(id)
            .await?
            .ok_or_else(|| ShelfpackError::JobNotFound(id.to_string()))
    }

    pub async fn children(&self, parent: JobId) -> Result<Vec<ChildJob>> {
        self.store.children_of(parent).await
    }

    pub async fn exports_for_user(&self, user: &UserId) -> Result<Vec<ExportJob>> {
        self.store.exports_for_user(user).await
    }

    pub async fn mark_active(&self, id: JobId, kind: Option<&ChildKind>) -> Result<bool> {
        self.transition(id, JobStatus::Active, kind).await
    }

    pub async fn mark_complete(&self, id: JobId, kind: Option<&ChildKind>) -> Result<bool> {
        self.transition(id, JobStatus::Complete, kind).await
    }

    pub async fn mark_stopped(
        &self,
        id: JobId,
        reason: StopReason,
        kind: Option<&ChildKind>,
    ) -> Result<bool> {
        self.transition(id, JobStatus::Stopped(reason), kind).await
    }

    pub async fn set_task_handle(&self, id: JobId, handle: &TaskHandle) -> Result<bool> {
        self.store.set_task_handle(id, handle).await
    }

    async fn transition(
        &self,
        id: JobId,
        status: JobStatus,
        kind: Option<&ChildKind>,
    ) -> Result<bool> {
        let applied = self.store.transition(id, status).await?;
        match (applied, kind) {
            (true, Some(kind)) => {
                crate::log_job_transition!(id, status, kind.tag());
            }
            (true, None) => {
                crate::log_job_transition!(id, status);
            }
            (false, _) => {
                tracing::debug!(job_id = %id, status = %status, "Job already terminal, transition ignored");
            }
        }
        Ok(applied)
    }
}
