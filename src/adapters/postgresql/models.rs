//! Row mapping for the `export_jobs` table

use crate::domain::{
    ArchiveLocation, ChildJob, ChildKind, ExportJob, Job, JobId, JobStatus, Result,
    ShelfpackError, TaskHandle, UserId,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;
use uuid::Uuid;

/// Columns selected by every job query, in a fixed order
pub const JOB_COLUMNS: &str = "id, parent_id, user_id, kind, status, stop_reason, task_handle, \
     document, json_completed, archive_location, created_at, updated_at";

/// One `export_jobs` row, before it is split into a root or a child job
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub kind: Option<Value>,
    pub status: String,
    pub stop_reason: Option<String>,
    pub task_handle: Option<String>,
    pub document: Option<Value>,
    pub json_completed: bool,
    pub archive_location: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            parent_id: row.get("parent_id"),
            user_id: row.get("user_id"),
            kind: row.get("kind"),
            status: row.get("status"),
            stop_reason: row.get("stop_reason"),
            task_handle: row.get("task_handle"),
            document: row.get("document"),
            json_completed: row.get("json_completed"),
            archive_location: row.get("archive_location"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn job(&self) -> Result<Job> {
        let status = JobStatus::from_parts(&self.status, self.stop_reason.as_deref())
            .map_err(|e| ShelfpackError::Database(format!("Job {}: {e}", self.id)))?;
        let task_handle = self
            .task_handle
            .as_deref()
            .map(TaskHandle::new)
            .transpose()
            .map_err(|e| ShelfpackError::Database(format!("Job {}: {e}", self.id)))?;
        Ok(Job {
            id: JobId::from_uuid(self.id),
            status,
            task_handle,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub fn into_export(self) -> Result<ExportJob> {
        let job = self.job()?;
        let user = self
            .user_id
            .ok_or_else(|| ShelfpackError::Database(format!("Job {} has no user", self.id)))?;
        let user_id = UserId::new(user).map_err(ShelfpackError::Database)?;
        let archive_location = self
            .archive_location
            .map(serde_json::from_value::<ArchiveLocation>)
            .transpose()?;
        Ok(ExportJob {
            job,
            user_id,
            document: self.document.unwrap_or_else(|| Value::Object(Default::default())),
            json_completed: self.json_completed,
            archive_location,
        })
    }

    pub fn into_child(self) -> Result<ChildJob> {
        let job = self.job()?;
        let parent = self
            .parent_id
            .ok_or_else(|| ShelfpackError::Database(format!("Job {} has no parent", self.id)))?;
        let kind_value = self
            .kind
            .ok_or_else(|| ShelfpackError::Database(format!("Job {} has no kind", self.id)))?;
        let kind: ChildKind = serde_json::from_value(kind_value)?;
        Ok(ChildJob {
            job,
            parent_id: JobId::from_uuid(parent),
            kind,
        })
    }
}
