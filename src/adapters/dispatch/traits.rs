//! Task dispatch traits

use crate::domain::{JobId, Result, TaskHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named unit of work with its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Snapshot the user and create the fixed child jobs of an export
    StartExport { job_id: JobId },
    /// Execute one child job
    RunChild { child_id: JobId },
}

impl Task {
    /// Stable task name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Task::StartExport { .. } => "start_export",
            Task::RunChild { .. } => "run_child",
        }
    }

    /// The job this task advances
    pub fn job_id(&self) -> JobId {
        match self {
            Task::StartExport { job_id } => *job_id,
            Task::RunChild { child_id } => *child_id,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.job_id())
    }
}

/// Accepts tasks for asynchronous execution
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Queue `task` on `queue` and return a handle identifying this execution.
    ///
    /// Returning `Ok` means the task was accepted, not that it ran.
    async fn enqueue(&self, task: Task, queue: &str) -> Result<TaskHandle>;
}

/// Executes dequeued tasks
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: Task, handle: TaskHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_names() {
        let id = JobId::new();
        assert_eq!(Task::StartExport { job_id: id }.name(), "start_export");
        assert_eq!(Task::RunChild { child_id: id }.name(), "run_child");
        assert_eq!(Task::RunChild { child_id: id }.job_id(), id);
    }

    #[test]
    fn test_task_serialization() {
        let id = JobId::new();
        let value = serde_json::to_value(Task::RunChild { child_id: id }).unwrap();
        assert_eq!(value["task"], "run_child");
        assert_eq!(value["child_id"], id.to_string());
    }
}
