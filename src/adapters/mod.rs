//! External system integrations for Shelfpack.
//!
//! - [`catalog`] - Host application API (users, editions, shelves, social graph)
//! - [`jobstore`] - Job persistence abstraction and the in-memory store
//! - [`postgresql`] - PostgreSQL job store
//! - [`storage`] - Local filesystem and S3-compatible archive storage
//! - [`dispatch`] - Task queue and worker pool
//!
//! # Design Pattern
//!
//! Each integration sits behind a trait so that the core only sees
//! `Arc<dyn Trait>`; tests swap in in-memory or recording implementations.
//!
//! ```rust,no_run
//! use shelfpack::adapters::storage::create_storage;
//! use shelfpack::config::StorageConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = create_storage(&StorageConfig::default())?;
//! println!("archives go to {:?}", storage.backend());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod dispatch;
pub mod jobstore;
pub mod postgresql;
pub mod storage;
