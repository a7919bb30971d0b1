//! Core business logic for Shelfpack.
//!
//! # Modules
//!
//! - [`export`] - Export orchestration: start, child jobs, fan-in, status
//! - [`jobs`] - Job lifecycle on top of the job store
//! - [`archive`] - Archive assembly through the storage adapter
//!
//! # Export Workflow
//!
//! 1. **Submit**: create the root job and queue `start_export`
//! 2. **Start**: snapshot the profile, create and queue the fixed children
//! 3. **Fan out**: one `AddBook` child per edition
//! 4. **Fan in**: the last finishing child starts the archive child, exactly once
//! 5. **Archive**: publish `exports/<task>.tar.gz` and complete the export
//!
//! # Example
//!
//! ```rust,no_run
//! use shelfpack::adapters::catalog::HttpCatalog;
//! use shelfpack::adapters::dispatch::WorkerPool;
//! use shelfpack::adapters::jobstore::create_job_store;
//! use shelfpack::adapters::storage::create_storage;
//! use shelfpack::config::load_config;
//! use shelfpack::core::export::ExportCoordinator;
//! use shelfpack::domain::UserId;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("shelfpack.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let (pool, queue) = WorkerPool::new(&config.workers);
//! let coordinator = Arc::new(ExportCoordinator::new(
//!     create_job_store(&config).await?,
//!     Arc::new(HttpCatalog::new(config.catalog.clone())?),
//!     create_storage(&config.storage)?,
//!     Arc::new(pool),
//!     config.workers.queue_name.clone(),
//! ));
//! let _workers = queue.spawn(coordinator.clone(), shutdown_rx);
//!
//! let job_id = coordinator.submit_export(UserId::new("mouse")?).await?;
//! println!("{}", coordinator.get_status(job_id).await?);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod export;
pub mod jobs;
