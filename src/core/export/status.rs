//! Export status reporting

use crate::domain::{
    ArchiveLocation, ChildJob, ExportJob, ExportStatus, JobId, JobStatus, StopReason, UserId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Child jobs of one export by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub total: usize,
    pub pending: usize,
    pub active: usize,
    pub complete: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl JobCounts {
    pub fn tally(children: &[ChildJob]) -> Self {
        children
            .iter()
            .fold(Self::default(), |mut counts, child| {
                counts.total += 1;
                match child.job.status {
                    JobStatus::Pending => counts.pending += 1,
                    JobStatus::Active => counts.active += 1,
                    JobStatus::Complete => counts.complete += 1,
                    JobStatus::Stopped(StopReason::Failed) => counts.failed += 1,
                    JobStatus::Stopped(StopReason::Cancelled) => counts.cancelled += 1,
                }
                counts
            })
    }
}

/// What `status <job_id>` reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportStatusReport {
    pub job_id: JobId,
    pub user_id: UserId,
    pub status: ExportStatus,
    /// Only present once the export is complete
    pub archive_location: Option<ArchiveLocation>,
    pub counts: JobCounts,
    /// Entries appended to `books` so far
    pub books: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExportStatusReport {
    pub fn new(export: &ExportJob, children: &[ChildJob]) -> Self {
        let status = ExportStatus::from(export.job.status);
        let archive_location = match status {
            ExportStatus::Complete => export.archive_location.clone(),
            _ => None,
        };
        let books = export
            .document
            .get(crate::domain::document::BOOKS_KEY)
            .and_then(|b| b.as_array())
            .map_or(0, Vec::len);

        Self {
            job_id: export.id(),
            user_id: export.user_id.clone(),
            status,
            archive_location,
            counts: JobCounts::tally(children),
            books,
            created_at: export.job.created_at,
            updated_at: export.job.updated_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ExportStatus::Complete | ExportStatus::Failed | ExportStatus::Cancelled
        )
    }
}

impl fmt::Display for ExportStatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Export {} for {}: {}", self.job_id, self.user_id, self.status)?;
        writeln!(
            f,
            "  children: {} total, {} pending, {} active, {} complete, {} failed, {} cancelled",
            self.counts.total,
            self.counts.pending,
            self.counts.active,
            self.counts.complete,
            self.counts.failed,
            self.counts.cancelled
        )?;
        write!(f, "  books: {}", self.books)?;
        if let Some(location) = &self.archive_location {
            write!(f, "\n  archive: {location}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChildKind, SocialSection};
    use serde_json::json;

    fn child(parent: JobId, status: JobStatus) -> ChildJob {
        let mut child = ChildJob::new(
            parent,
            ChildKind::SocialGraph {
                section: SocialSection::Follows,
            },
        );
        child.job.set_status(status);
        child
    }

    #[test]
    fn test_counts() {
        let parent = JobId::new();
        let children = vec![
            child(parent, JobStatus::Pending),
            child(parent, JobStatus::Complete),
            child(parent, JobStatus::Complete),
            child(parent, JobStatus::Stopped(StopReason::Failed)),
        ];
        let counts = JobCounts::tally(&children);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.complete, 2);
        assert_eq!(counts.failed, 1);
    }

    #[test]
    fn test_failed_export_hides_location() {
        let mut export = ExportJob::new(UserId::new("mouse").unwrap());
        export.archive_location = Some(ArchiveLocation::RemoteKey("exports/t.tar.gz".into()));
        export.job.mark_stopped(StopReason::Failed);

        let report = ExportStatusReport::new(&export, &[]);
        assert_eq!(report.status, ExportStatus::Failed);
        assert!(report.archive_location.is_none());
        assert!(report.is_terminal());
    }

    #[test]
    fn test_complete_export_reports_location_and_books() {
        let mut export = ExportJob::new(UserId::new("mouse").unwrap());
        export.document = json!({"books": [{}, {}]});
        export.archive_location = Some(ArchiveLocation::LocalPath("/data/exports/t.tar.gz".into()));
        export.job.mark_complete();

        let report = ExportStatusReport::new(&export, &[]);
        assert_eq!(report.books, 2);
        assert_eq!(
            report.archive_location.unwrap().as_str(),
            "/data/exports/t.tar.gz"
        );
    }
}
