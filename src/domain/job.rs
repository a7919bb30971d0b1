//! Job model
//!
//! A root [`ExportJob`] owns the accumulated export document and fans out into
//! [`ChildJob`]s. Children point back at their parent by id only; the job store
//! is the arena that resolves those ids.
//!
//! Status transitions follow a small state machine:
//!
//! ```text
//! pending -> active -> complete
//!    \          \
//!     +----------+--> stopped(failed | cancelled)
//! ```
//!
//! `complete` and `stopped` are terminal. Once terminal, every mutator is a
//! no-op that leaves both status and `updated_at` untouched.

use super::ids::{EditionId, JobId, TaskHandle, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a job stopped without completing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Failed,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Failed => "failed",
            StopReason::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "failed" => Ok(StopReason::Failed),
            "cancelled" => Ok(StopReason::Cancelled),
            other => Err(format!("Unknown stop reason: {other}")),
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Active,
    Complete,
    Stopped(StopReason),
}

impl JobStatus {
    /// True for `complete` and `stopped`
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Stopped(_))
    }

    /// Status column value, without the stop reason
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Active => "active",
            JobStatus::Complete => "complete",
            JobStatus::Stopped(_) => "stopped",
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            JobStatus::Stopped(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Rebuilds a status from its persisted status and reason columns
    pub fn from_parts(status: &str, reason: Option<&str>) -> Result<Self, String> {
        match status {
            "pending" => Ok(JobStatus::Pending),
            "active" => Ok(JobStatus::Active),
            "complete" => Ok(JobStatus::Complete),
            "stopped" => {
                let reason = reason.ok_or("Stopped job without a stop reason")?;
                Ok(JobStatus::Stopped(StopReason::parse(reason)?))
            }
            other => Err(format!("Unknown job status: {other}")),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Stopped(reason) => write!(f, "stopped({reason})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Fields shared by every job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Task currently advancing this job, if any
    pub task_handle: Option<TaskHandle>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            task_handle: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves the job to `status` unless it is already terminal.
    ///
    /// Returns whether the job changed.
    pub fn set_status(&mut self, status: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = status;
        self.updated_at = Utc::now();
        true
    }

    pub fn mark_active(&mut self) -> bool {
        self.set_status(JobStatus::Active)
    }

    pub fn mark_complete(&mut self) -> bool {
        self.set_status(JobStatus::Complete)
    }

    pub fn mark_stopped(&mut self, reason: StopReason) -> bool {
        self.set_status(JobStatus::Stopped(reason))
    }

    /// Refreshes `updated_at` on a live job
    pub fn touch(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.updated_at = Utc::now();
        true
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

/// Social graph snapshot written by one fixed child job each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialSection {
    SavedLists,
    Follows,
    Blocks,
    Goals,
}

impl SocialSection {
    pub const ALL: [SocialSection; 4] = [
        SocialSection::SavedLists,
        SocialSection::Follows,
        SocialSection::Blocks,
        SocialSection::Goals,
    ];

    /// Top-level key of the export document this section owns
    pub fn document_key(&self) -> &'static str {
        match self {
            SocialSection::SavedLists => "saved_lists",
            SocialSection::Follows => "follows",
            SocialSection::Blocks => "blocks",
            SocialSection::Goals => "goals",
        }
    }
}

impl fmt::Display for SocialSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.document_key())
    }
}

/// What a child job does when it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChildKind {
    /// Snapshot one social graph section into the document
    SocialGraph { section: SocialSection },
    /// Enumerate the user's editions and create one `AddBook` child each
    BookFanOut,
    /// Gather one edition's metadata and append it to `books`
    AddBook { edition_id: EditionId },
    /// Assemble and publish the archive
    BuildArchive,
}

impl ChildKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ChildKind::SocialGraph { .. } => "social_graph",
            ChildKind::BookFanOut => "book_fan_out",
            ChildKind::AddBook { .. } => "add_book",
            ChildKind::BuildArchive => "build_archive",
        }
    }

    /// Whether a failure of this child fails the whole export.
    ///
    /// Only per-book metadata failures are isolated.
    pub fn fails_parent(&self) -> bool {
        !matches!(self, ChildKind::AddBook { .. })
    }
}

/// Where a finished archive was published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", content = "location", rename_all = "snake_case")]
pub enum ArchiveLocation {
    LocalPath(String),
    RemoteKey(String),
}

impl ArchiveLocation {
    pub fn as_str(&self) -> &str {
        match self {
            ArchiveLocation::LocalPath(p) | ArchiveLocation::RemoteKey(p) => p,
        }
    }
}

impl fmt::Display for ArchiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveLocation::LocalPath(p) => write!(f, "file://{p}"),
            ArchiveLocation::RemoteKey(k) => write!(f, "s3://{k}"),
        }
    }
}

/// Root job of one export request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub job: Job,
    pub user_id: UserId,
    /// Accumulated export document; `archive.json` inside the archive
    pub document: serde_json::Value,
    /// Set exactly once, by whoever starts the archive phase
    pub json_completed: bool,
    pub archive_location: Option<ArchiveLocation>,
}

impl ExportJob {
    pub fn new(user_id: UserId) -> Self {
        Self {
            job: Job::new(),
            user_id,
            document: serde_json::Value::Object(serde_json::Map::new()),
            json_completed: false,
            archive_location: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.job.id
    }

    /// True when every known child is terminal
    pub fn has_completed(&self, children: &[ChildJob]) -> bool {
        children.iter().all(|child| child.job.is_terminal())
    }
}

/// A unit of work contributing to one export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildJob {
    pub job: Job,
    pub parent_id: JobId,
    pub kind: ChildKind,
}

impl ChildJob {
    pub fn new(parent_id: JobId, kind: ChildKind) -> Self {
        Self {
            job: Job::new(),
            parent_id,
            kind,
        }
    }

    pub fn id(&self) -> JobId {
        self.job.id
    }
}

/// Externally visible status of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Active,
    Complete,
    Failed,
    Cancelled,
}

impl From<JobStatus> for ExportStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => ExportStatus::Pending,
            JobStatus::Active => ExportStatus::Active,
            JobStatus::Complete => ExportStatus::Complete,
            JobStatus::Stopped(StopReason::Failed) => ExportStatus::Failed,
            JobStatus::Stopped(StopReason::Cancelled) => ExportStatus::Cancelled,
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportStatus::Pending => "pending",
            ExportStatus::Active => "active",
            ExportStatus::Complete => "complete",
            ExportStatus::Failed => "failed",
            ExportStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
