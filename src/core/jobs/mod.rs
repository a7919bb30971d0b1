//! Job lifecycle management

pub mod manager;

pub use manager::JobManager;
