//! PostgreSQL job store
//!
//! Root export jobs and their children share the `export_jobs` table; see
//! `migrations/001_initial_schema.sql`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgresJobStore;
pub use client::PostgreSQLClient;
pub use models::JobRow;
