//! Export coordinator - main orchestrator for the export process
//!
//! Owns the root export job and every child it spawns:
//!
//! 1. `submit_export` creates the root job and queues `start_export`
//! 2. `start` snapshots the profile into the document, creates the four
//!    social graph children and the book fan-out child, then queues them
//! 3. `run_child` executes one child; the fan-out child creates one
//!    `AddBook` child per edition
//! 4. every finished child notifies the [`CompletionAggregator`], which starts
//!    the archive child once and completes the export after it
//!
//! Failures are persisted as job state. Only `AddBook` failures are isolated;
//! any other failing child stops the whole export.

use crate::adapters::catalog::Catalog;
use crate::adapters::dispatch::{Task, TaskDispatcher, TaskHandler};
use crate::adapters::jobstore::JobStore;
use crate::adapters::storage::StorageAdapter;
use crate::core::archive::ArchiveBuilder;
use crate::core::export::aggregator::{CompletionAggregator, NotifyOutcome};
use crate::core::export::books::book_entry;
use crate::core::export::profile::base_document;
use crate::core::export::social::snapshot_section;
use crate::core::export::status::ExportStatusReport;
use crate::core::jobs::JobManager;
use crate::domain::{
    ChildJob, ChildKind, EditionId, ExportJob, JobId, Result, ShelfpackError, SocialSection,
    StopReason, TaskHandle, UserId,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of running `start_export`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The export was already terminal, usually cancelled before it started
    Skipped,
    /// The fixed children were created and queued
    Started { children: usize },
    /// The export was stopped as failed
    Failed,
}

/// Result of running one child job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// The child or its export was already terminal
    Skipped,
    Completed,
    /// The child was stopped as failed; for non-book children so was the export
    Failed,
}

/// Export coordinator
pub struct ExportCoordinator {
    jobs: JobManager,
    catalog: Arc<dyn Catalog>,
    dispatcher: Arc<dyn TaskDispatcher>,
    aggregator: CompletionAggregator,
    archive: ArchiveBuilder,
    queue: String,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    ///
    /// Every task is queued on `queue`.
    pub fn new(
        store: Arc<dyn JobStore>,
        catalog: Arc<dyn Catalog>,
        storage: Arc<dyn StorageAdapter>,
        dispatcher: Arc<dyn TaskDispatcher>,
        queue: impl Into<String>,
    ) -> Self {
        let queue = queue.into();
        let jobs = JobManager::new_with_store(store);
        let aggregator = CompletionAggregator::new(jobs.clone(), dispatcher.clone(), queue.clone());
        Self {
            jobs,
            catalog,
            dispatcher,
            aggregator,
            archive: ArchiveBuilder::new(storage),
            queue,
        }
    }

    pub fn jobs(&self) -> &JobManager {
        &self.jobs
    }

    pub fn aggregator(&self) -> &CompletionAggregator {
        &self.aggregator
    }

    /// Create a pending export for `user` and queue its start task
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be stored or the start task cannot
    /// be queued; in the latter case the job is stopped as failed.
    pub async fn submit_export(&self, user: UserId) -> Result<JobId> {
        let export = self.jobs.create_export(user).await?;
        let job_id = export.id();

        match self
            .dispatcher
            .enqueue(Task::StartExport { job_id }, &self.queue)
            .await
        {
            Ok(handle) => {
                self.jobs.set_task_handle(job_id, &handle).await?;
                tracing::info!(job_id = %job_id, user_id = %export.user_id, "Export submitted");
                Ok(job_id)
            }
            Err(e) => {
                self.jobs
                    .mark_stopped(job_id, StopReason::Failed, None)
                    .await?;
                Err(e)
            }
        }
    }

    /// Run the start task of an export
    pub async fn start(&self, job_id: JobId) -> Result<StartOutcome> {
        let export = self.jobs.export(job_id).await?;
        if export.job.is_terminal() {
            tracing::info!(job_id = %job_id, status = %export.job.status, "Export not started, already terminal");
            return Ok(StartOutcome::Skipped);
        }

        match self.start_export(&export).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.fail_export(job_id, &e, "start_export").await?;
                Ok(StartOutcome::Failed)
            }
        }
    }

    async fn start_export(&self, export: &ExportJob) -> Result<StartOutcome> {
        let job_id = export.id();
        if !self.jobs.mark_active(job_id, None).await? {
            return Ok(StartOutcome::Skipped);
        }

        let user = self.catalog.user(&export.user_id).await?;
        let document = base_document(&user)?;
        if !self.jobs.store().set_document(job_id, &document).await? {
            return Ok(StartOutcome::Skipped);
        }

        let kinds = SocialSection::ALL
            .into_iter()
            .map(|section| ChildKind::SocialGraph { section })
            .chain(std::iter::once(ChildKind::BookFanOut));

        // Every fixed child exists before any of them runs, so no early
        // finisher can see an incomplete child list.
        let mut children = Vec::new();
        for kind in kinds {
            match self.jobs.create_child(job_id, kind).await? {
                Some(child) => children.push(child),
                None => return Ok(StartOutcome::Skipped),
            }
        }

        for child in &children {
            if let Err(e) = self.enqueue_child(child).await {
                self.jobs
                    .mark_stopped(child.id(), StopReason::Failed, Some(&child.kind))
                    .await?;
                return Err(e);
            }
        }

        tracing::info!(job_id = %job_id, children = children.len(), "Export started");
        Ok(StartOutcome::Started {
            children: children.len(),
        })
    }

    async fn enqueue_child(&self, child: &ChildJob) -> Result<TaskHandle> {
        let handle = self
            .dispatcher
            .enqueue(
                Task::RunChild {
                    child_id: child.id(),
                },
                &self.queue,
            )
            .await?;
        self.jobs.set_task_handle(child.id(), &handle).await?;
        Ok(handle)
    }

    /// Run one child job
    pub async fn run_child(&self, child_id: JobId) -> Result<ChildOutcome> {
        let child = self.jobs.child(child_id).await?;
        let export = self.jobs.export(child.parent_id).await?;

        if export.job.is_terminal() {
            tracing::debug!(child_id = %child_id, job_id = %export.id(), "Export no longer live, child skipped");
            return Ok(ChildOutcome::Skipped);
        }
        if child.job.is_terminal() {
            tracing::debug!(child_id = %child_id, "Child already terminal, redelivery skipped");
            return Ok(ChildOutcome::Skipped);
        }
        if !self.jobs.mark_active(child_id, Some(&child.kind)).await? {
            return Ok(ChildOutcome::Skipped);
        }

        let result = match &child.kind {
            ChildKind::SocialGraph { section } => self.run_social(&export, *section).await,
            ChildKind::BookFanOut => self.run_fan_out(&export).await,
            ChildKind::AddBook { edition_id } => {
                self.run_add_book(&export, child_id, edition_id).await
            }
            ChildKind::BuildArchive => self.run_build_archive(&export).await,
        };

        match result {
            Ok(()) => {
                self.jobs.mark_complete(child_id, Some(&child.kind)).await?;
                self.notify(export.id()).await?;
                Ok(ChildOutcome::Completed)
            }
            Err(e) => {
                tracing::error!(
                    job_id = %export.id(),
                    child_id = %child_id,
                    kind = child.kind.tag(),
                    error = %e,
                    "Child job failed"
                );
                self.jobs
                    .mark_stopped(child_id, StopReason::Failed, Some(&child.kind))
                    .await?;
                if child.kind.fails_parent() {
                    self.jobs
                        .mark_stopped(export.id(), StopReason::Failed, None)
                        .await?;
                } else {
                    self.notify(export.id()).await?;
                }
                Ok(ChildOutcome::Failed)
            }
        }
    }

    async fn run_social(&self, export: &ExportJob, section: SocialSection) -> Result<()> {
        let value = snapshot_section(self.catalog.as_ref(), &export.user_id, section).await?;
        self.jobs
            .store()
            .set_document_key(export.id(), section.document_key(), &value)
            .await?;
        Ok(())
    }

    async fn run_fan_out(&self, export: &ExportJob) -> Result<()> {
        let editions = self.catalog.books_for_user(&export.user_id).await?;
        let mut seen = HashSet::new();

        let mut children = Vec::new();
        for edition_id in editions {
            if !seen.insert(edition_id.clone()) {
                continue;
            }
            match self
                .jobs
                .create_child(export.id(), ChildKind::AddBook { edition_id })
                .await?
            {
                Some(child) => children.push(child),
                None => return Ok(()),
            }
        }

        for child in &children {
            if let Err(e) = self.enqueue_child(child).await {
                tracing::warn!(child_id = %child.id(), error = %e, "Failed to queue book job");
                self.jobs
                    .mark_stopped(child.id(), StopReason::Failed, Some(&child.kind))
                    .await?;
            }
        }

        tracing::info!(job_id = %export.id(), books = children.len(), "Book jobs created");
        Ok(())
    }

    async fn run_add_book(
        &self,
        export: &ExportJob,
        child_id: JobId,
        edition_id: &EditionId,
    ) -> Result<()> {
        let entry = book_entry(self.catalog.as_ref(), &export.user_id, edition_id).await?;
        if !self
            .jobs
            .store()
            .append_book(export.id(), child_id, &entry)
            .await?
        {
            tracing::debug!(
                job_id = %export.id(),
                child_id = %child_id,
                edition_id = %edition_id,
                "Book entry not appended, export no longer live or entry already present"
            );
        }
        Ok(())
    }

    async fn run_build_archive(&self, export: &ExportJob) -> Result<()> {
        let location = self.archive.build(export).await?;
        if !self
            .jobs
            .store()
            .set_archive_location(export.id(), &location)
            .await?
        {
            tracing::warn!(job_id = %export.id(), location = %location, "Archive location not recorded");
        }
        Ok(())
    }

    /// Let the aggregator re-evaluate an export
    pub async fn notify(&self, job_id: JobId) -> Result<NotifyOutcome> {
        let outcome = self.aggregator.notify_child_job_complete(job_id).await?;
        tracing::debug!(job_id = %job_id, outcome = ?outcome, "Aggregator notified");
        Ok(outcome)
    }

    pub async fn get_status(&self, job_id: JobId) -> Result<ExportStatusReport> {
        let export = self.jobs.export(job_id).await?;
        let children = self.jobs.children(job_id).await?;
        Ok(ExportStatusReport::new(&export, &children))
    }

    /// Stop a live export as cancelled.
    ///
    /// Returns `false` if it was already terminal.
    pub async fn cancel(&self, job_id: JobId) -> Result<bool> {
        self.jobs.export(job_id).await?;
        let cancelled = self
            .jobs
            .mark_stopped(job_id, StopReason::Cancelled, None)
            .await?;
        if cancelled {
            tracing::info!(job_id = %job_id, "Export cancelled");
        }
        Ok(cancelled)
    }

    async fn fail_export(&self, job_id: JobId, error: &ShelfpackError, stage: &str) -> Result<()> {
        crate::log_error_with_context!(error, stage);
        self.jobs
            .mark_stopped(job_id, StopReason::Failed, None)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskHandler for ExportCoordinator {
    async fn handle(&self, task: Task, handle: TaskHandle) -> Result<()> {
        match task {
            Task::StartExport { job_id } => {
                let outcome = self.start(job_id).await?;
                tracing::debug!(job_id = %job_id, task_handle = %handle, outcome = ?outcome, "start_export finished");
            }
            Task::RunChild { child_id } => {
                let outcome = self.run_child(child_id).await?;
                tracing::debug!(child_id = %child_id, task_handle = %handle, outcome = ?outcome, "run_child finished");
            }
        }
        Ok(())
    }
}
