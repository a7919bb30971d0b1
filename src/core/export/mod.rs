//! Export orchestration
//!
//! - [`coordinator`] - root job lifecycle and child execution
//! - [`aggregator`] - fan-in of child completions
//! - [`profile`], [`social`], [`books`] - the document fragments each job writes
//! - [`status`] - status reporting

pub mod aggregator;
pub mod books;
pub mod coordinator;
pub mod profile;
pub mod social;
pub mod status;

pub use aggregator::{CompletionAggregator, NotifyOutcome};
pub use coordinator::{ChildOutcome, ExportCoordinator, StartOutcome};
pub use status::{ExportStatusReport, JobCounts};
