// Shelfpack - account export orchestration
// Copyright (c) 2025 Shelfpack Contributors
// Licensed under the MIT License

//! # Shelfpack - account export orchestration
//!
//! Shelfpack builds a portable archive of one user's account from a reading
//! catalog: profile, shelves, reviews, reading progress, social graph and the
//! images they reference, packed as a gzip tarball.
//!
//! ## Overview
//!
//! An export is a tree of jobs persisted in a job store:
//!
//! - one **root export job** holding the JSON document being assembled
//! - four **social graph** children and one **book fan-out** child
//! - one **add-book** child per edition on the user's shelves
//! - one **build-archive** child, started exactly once after every other
//!   child has finished
//!
//! Children run on a bounded worker pool. Each finished child notifies the
//! completion aggregator, which decides when the archive is built and when the
//! export is complete.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Export orchestration, job lifecycle and archive building
//! - [`adapters`] - Job stores, storage backends, catalog client, worker pool
//! - [`domain`] - Job model, identifiers and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shelfpack::config::load_config;
//! use shelfpack::cli::runtime::ExportRuntime;
//! use shelfpack::domain::UserId;
//! use tokio::sync::watch;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("shelfpack.toml")?;
//! let runtime = ExportRuntime::build(&config).await?;
//!
//! let (_stop, shutdown) = watch::channel(false);
//! let (coordinator, _pool, _workers) = runtime.spawn_workers(shutdown);
//!
//! let job_id = coordinator.submit_export(UserId::new("reader-42")?).await?;
//! let report = coordinator.get_status(job_id).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::Result`] with [`domain::ShelfpackError`].
//! Failures inside a job are recorded as job state rather than returned:
//! a failing book is isolated to its own child, any other failing child stops
//! the whole export.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
