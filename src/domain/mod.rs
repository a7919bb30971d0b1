//! Domain models and types for Shelfpack.
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`], [`UserId`], [`EditionId`], [`TaskHandle`])
//! - **The job model** ([`ExportJob`], [`ChildJob`], [`JobStatus`])
//! - **Export document helpers** ([`document`])
//! - **Error types** ([`ShelfpackError`], [`StorageError`], [`CatalogError`])
//! - **Result type alias** ([`Result`])
//!
//! Nothing in this module performs I/O.

pub mod document;
pub mod errors;
pub mod ids;
pub mod job;
pub mod result;

pub use errors::{CatalogError, ShelfpackError, StorageError};
pub use ids::{EditionId, JobId, TaskHandle, UserId};
pub use job::{
    ArchiveLocation, ChildJob, ChildKind, ExportJob, ExportStatus, Job, JobStatus, SocialSection,
    StopReason,
};
pub use result::Result;
