//! Task dispatch
//!
//! Export work is expressed as [`Task`] values queued through a
//! [`TaskDispatcher`]. The production dispatcher is the in-process
//! [`WorkerPool`]; tests substitute their own.

pub mod pool;
pub mod traits;

pub use pool::{WorkerPool, WorkerQueue};
pub use traits::{Task, TaskDispatcher, TaskHandler};
