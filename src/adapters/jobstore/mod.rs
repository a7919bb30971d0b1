//! Job store abstraction
//!
//! - [`memory`] - process-local arena, used by tests and single-process runs
//! - PostgreSQL - see [`crate::adapters::postgresql`]

pub mod factory;
pub mod memory;
pub mod traits;

pub use factory::create_job_store;
pub use memory::InMemoryJobStore;
pub use traits::JobStore;
