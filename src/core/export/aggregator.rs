//! Completion aggregator
//!
//! Every child that reaches a terminal state notifies its parent here. The
//! first notification that sees every child terminal wins the
//! `json_completed` compare-and-set and starts the archive child; the
//! notification sent when that archive child finishes completes the export.

use crate::adapters::dispatch::{Task, TaskDispatcher};
use crate::core::jobs::JobManager;
use crate::domain::{ChildKind, JobId, JobStatus, Result, StopReason};
use std::sync::Arc;

/// What a notification did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The export is already terminal
    Ignored,
    /// Some child is still running, or the archive child is not attached yet
    Waiting,
    /// This notification won the race and started the archive child
    ArchiveStarted(JobId),
    /// Another notification already started the archive phase
    LostRace,
    /// The archive is published and the export is complete
    Completed,
    /// Starting the archive phase failed; the export is stopped
    Failed,
}

pub struct CompletionAggregator {
    jobs: JobManager,
    dispatcher: Arc<dyn TaskDispatcher>,
    queue: String,
}

impl CompletionAggregator {
    pub fn new(jobs: JobManager, dispatcher: Arc<dyn TaskDispatcher>, queue: String) -> Self {
        Self {
            jobs,
            dispatcher,
            queue,
        }
    }

    /// Re-evaluate an export after one of its children finished
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ShelfpackError::JobNotFound`] for an unknown
    /// export, or a store error.
    pub async fn notify_child_job_complete(&self, parent: JobId) -> Result<NotifyOutcome> {
        let export = self.jobs.export(parent).await?;
        if export.job.is_terminal() {
            return Ok(NotifyOutcome::Ignored);
        }

        if !self.jobs.store().touch(parent).await? {
            return Ok(NotifyOutcome::Ignored);
        }

        let children = self.jobs.children(parent).await?;
        if !export.has_completed(&children) {
            return Ok(NotifyOutcome::Waiting);
        }

        if !export.json_completed {
            if !self.jobs.store().mark_json_completed(parent).await? {
                tracing::debug!(job_id = %parent, "Archive phase already claimed");
                return Ok(NotifyOutcome::LostRace);
            }
            return self.start_archive(parent).await;
        }

        let archive_done = children.iter().any(|child| {
            child.kind == ChildKind::BuildArchive && child.job.status == JobStatus::Complete
        });
        if archive_done && export.archive_location.is_some() {
            if self.jobs.mark_complete(parent, None).await? {
                return Ok(NotifyOutcome::Completed);
            }
            return Ok(NotifyOutcome::Ignored);
        }

        Ok(NotifyOutcome::Waiting)
    }

    async fn start_archive(&self, parent: JobId) -> Result<NotifyOutcome> {
        let child = match self.jobs.create_child(parent, ChildKind::BuildArchive).await {
            Ok(Some(child)) => child,
            Ok(None) => return Ok(NotifyOutcome::Ignored),
            Err(e) => {
                crate::log_error_with_context!(e, "create archive job");
                self.jobs
                    .mark_stopped(parent, StopReason::Failed, None)
                    .await?;
                return Ok(NotifyOutcome::Failed);
            }
        };

        let task = Task::RunChild {
            child_id: child.id(),
        };
        match self.dispatcher.enqueue(task, &self.queue).await {
            Ok(handle) => {
                self.jobs.set_task_handle(child.id(), &handle).await?;
                tracing::info!(job_id = %parent, child_id = %child.id(), "Archive phase started");
                Ok(NotifyOutcome::ArchiveStarted(child.id()))
            }
            Err(e) => {
                crate::log_error_with_context!(e, "enqueue archive job");
                self.jobs
                    .mark_stopped(child.id(), StopReason::Failed, Some(&child.kind))
                    .await?;
                self.jobs
                    .mark_stopped(parent, StopReason::Failed, None)
                    .await?;
                Ok(NotifyOutcome::Failed)
            }
        }
    }
}
