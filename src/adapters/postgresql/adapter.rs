//! PostgreSQL job store
//!
//! Every conditional write is a single `UPDATE ... WHERE <condition>`
//! statement, so the row lock PostgreSQL takes for the update is what makes
//! compare-and-set and list-append atomic across worker processes.

use crate::adapters::jobstore::JobStore;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{JobRow, JOB_COLUMNS};
use crate::domain::document::BOOKS_KEY;
use crate::domain::{
    ArchiveLocation, ChildJob, ExportJob, JobId, JobStatus, Result, TaskHandle, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Predicate shared by every update that must not touch a terminal job
const LIVE: &str = "status IN ('pending', 'active')";

pub struct PostgresJobStore {
    client: Arc<PostgreSQLClient>,
}

impl PostgresJobStore {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    async fn load(&self, id: JobId, roots: bool) -> Result<Option<JobRow>> {
        let filter = if roots {
            "parent_id IS NULL"
        } else {
            "parent_id IS NOT NULL"
        };
        let query = format!("SELECT {JOB_COLUMNS} FROM export_jobs WHERE id = $1 AND {filter}");
        let row = self.client.query_opt(&query, &[id.as_uuid()]).await?;
        Ok(row.as_ref().map(JobRow::from_row))
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn create_export(&self, export: &ExportJob) -> Result<()> {
        let query = r#"
            INSERT INTO export_jobs (
                id, parent_id, user_id, kind, status, stop_reason, task_handle,
                document, json_completed, archive_location, created_at, updated_at
            )
            VALUES ($1, NULL, $2, NULL, $3, $4, $5, $6, $7, $8, $9, $10)
        "#;
        let archive_location = export
            .archive_location
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let stop_reason = export.job.status.stop_reason().map(|r| r.as_str());
        let task_handle = export.job.task_handle.as_ref().map(|h| h.as_str());

        self.client
            .execute(
                query,
                &[
                    export.job.id.as_uuid(),
                    &export.user_id.as_str(),
                    &export.job.status.as_str(),
                    &stop_reason,
                    &task_handle,
                    &export.document,
                    &export.json_completed,
                    &archive_location,
                    &export.job.created_at,
                    &export.job.updated_at,
                ],
            )
            .await?;

        tracing::debug!(job_id = %export.id(), user_id = %export.user_id, "Inserted export job");
        Ok(())
    }

    async fn create_child(&self, child: &ChildJob) -> Result<bool> {
        // Insert only while the parent is live
        let query = format!(
            r#"
            INSERT INTO export_jobs (
                id, parent_id, user_id, kind, status, stop_reason, task_handle,
                document, json_completed, archive_location, created_at, updated_at
            )
            SELECT $1::uuid, p.id, NULL, $3::jsonb, $4::text, $5::text, $6::text,
                   NULL, FALSE, NULL, $7::timestamptz, $8::timestamptz
            FROM export_jobs p
            WHERE p.id = $2 AND p.parent_id IS NULL AND p.{LIVE}
            "#
        );
        let kind = serde_json::to_value(&child.kind)?;
        let stop_reason = child.job.status.stop_reason().map(|r| r.as_str());
        let task_handle = child.job.task_handle.as_ref().map(|h| h.as_str());

        let inserted = self
            .client
            .execute(
                &query,
                &[
                    child.job.id.as_uuid(),
                    child.parent_id.as_uuid(),
                    &kind,
                    &child.job.status.as_str(),
                    &stop_reason,
                    &task_handle,
                    &child.job.created_at,
                    &child.job.updated_at,
                ],
            )
            .await?;

        Ok(inserted == 1)
    }

    async fn export(&self, id: JobId) -> Result<Option<ExportJob>> {
        self.load(id, true)
            .await?
            .map(JobRow::into_export)
            .transpose()
    }

    async fn child(&self, id: JobId) -> Result<Option<ChildJob>> {
        self.load(id, false)
            .await?
            .map(JobRow::into_child)
            .transpose()
    }

    async fn children_of(&self, parent: JobId) -> Result<Vec<ChildJob>> {
        let query =
            format!("SELECT {JOB_COLUMNS} FROM export_jobs WHERE parent_id = $1 ORDER BY seq");
        let rows = self.client.query(&query, &[parent.as_uuid()]).await?;
        rows.iter()
            .map(|row| JobRow::from_row(row).into_child())
            .collect()
    }

    async fn exports_for_user(&self, user: &UserId) -> Result<Vec<ExportJob>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM export_jobs \
             WHERE parent_id IS NULL AND user_id = $1 ORDER BY seq DESC"
        );
        let rows = self.client.query(&query, &[&user.as_str()]).await?;
        rows.iter()
            .map(|row| JobRow::from_row(row).into_export())
            .collect()
    }

    async fn transition(&self, id: JobId, status: JobStatus) -> Result<bool> {
        let query = format!(
            "UPDATE export_jobs SET status = $2, stop_reason = $3, updated_at = $4 \
             WHERE id = $1 AND {LIVE}"
        );
        let stop_reason = status.stop_reason().map(|r| r.as_str());
        let updated = self
            .client
            .execute(
                &query,
                &[id.as_uuid(), &status.as_str(), &stop_reason, &Utc::now()],
            )
            .await?;

        if updated == 1 {
            tracing::debug!(job_id = %id, status = %status, "Persisted job transition");
        }
        Ok(updated == 1)
    }

    async fn touch(&self, id: JobId) -> Result<bool> {
        let query = format!("UPDATE export_jobs SET updated_at = $2 WHERE id = $1 AND {LIVE}");
        let updated = self
            .client
            .execute(&query, &[id.as_uuid(), &Utc::now()])
            .await?;
        Ok(updated == 1)
    }

    async fn set_task_handle(&self, id: JobId, handle: &TaskHandle) -> Result<bool> {
        let query = format!(
            "UPDATE export_jobs SET task_handle = $2, updated_at = $3 WHERE id = $1 AND {LIVE}"
        );
        let updated = self
            .client
            .execute(&query, &[id.as_uuid(), &handle.as_str(), &Utc::now()])
            .await?;
        Ok(updated == 1)
    }

    async fn set_document(&self, id: JobId, document: &Value) -> Result<bool> {
        let query = format!(
            "UPDATE export_jobs SET document = $2, updated_at = $3 \
             WHERE id = $1 AND parent_id IS NULL AND {LIVE}"
        );
        let updated = self
            .client
            .execute(&query, &[id.as_uuid(), document, &Utc::now()])
            .await?;
        Ok(updated == 1)
    }

    async fn set_document_key(&self, id: JobId, key: &str, value: &Value) -> Result<bool> {
        let query = format!(
            "UPDATE export_jobs \
             SET document = jsonb_set(COALESCE(document, '{{}}'::jsonb), ARRAY[$2::text], $3::jsonb, true), \
                 updated_at = $4 \
             WHERE id = $1 AND parent_id IS NULL AND {LIVE}"
        );
        let updated = self
            .client
            .execute(&query, &[id.as_uuid(), &key, value, &Utc::now()])
            .await?;
        Ok(updated == 1)
    }

    async fn append_book(&self, id: JobId, writer: JobId, entry: &Value) -> Result<bool> {
        let query = format!(
            "UPDATE export_jobs \
             SET document = jsonb_set( \
                     COALESCE(document, '{{}}'::jsonb), \
                     ARRAY[$2::text], \
                     COALESCE(document -> $2::text, '[]'::jsonb) || jsonb_build_array($3::jsonb), \
                     true), \
                 book_children = array_append(book_children, $5::uuid), \
                 updated_at = $4 \
             WHERE id = $1 AND parent_id IS NULL AND {LIVE} \
               AND NOT ($5::uuid = ANY(book_children))"
        );
        let updated = self
            .client
            .execute(
                &query,
                &[id.as_uuid(), &BOOKS_KEY, entry, &Utc::now(), writer.as_uuid()],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn mark_json_completed(&self, id: JobId) -> Result<bool> {
        let query = format!(
            "UPDATE export_jobs SET json_completed = TRUE, updated_at = $2 \
             WHERE id = $1 AND parent_id IS NULL AND json_completed = FALSE AND {LIVE}"
        );
        let updated = self
            .client
            .execute(&query, &[id.as_uuid(), &Utc::now()])
            .await?;
        Ok(updated == 1)
    }

    async fn set_archive_location(&self, id: JobId, location: &ArchiveLocation) -> Result<bool> {
        let query = format!(
            "UPDATE export_jobs SET archive_location = $2, updated_at = $3 \
             WHERE id = $1 AND parent_id IS NULL AND archive_location IS NULL AND {LIVE}"
        );
        let location = serde_json::to_value(location)?;
        let updated = self
            .client
            .execute(&query, &[id.as_uuid(), &location, &Utc::now()])
            .await?;
        Ok(updated == 1)
    }
}
