//! Export command implementation
//!
//! This module implements the `export` command, which runs the worker pool
//! in-process, submits one account export and waits for it to finish.

use crate::cli::runtime::ExportRuntime;
use crate::config::load_config;
use crate::core::export::ExportStatusReport;
use crate::domain::{ExportStatus, UserId};
use clap::Args;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// User whose account is exported
    #[arg(short, long)]
    pub user: String,

    /// Cancel the export if it is not finished after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(user_id = %self.user, "Starting export command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(e.exit_code());
            }
        };

        let user = match UserId::new(self.user.as_str()) {
            Ok(u) => u,
            Err(e) => {
                eprintln!("Invalid user: {e}");
                return Ok(2);
            }
        };

        let runtime = match ExportRuntime::build(&config).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize export runtime");
                eprintln!("Failed to initialize export: {e}");
                return Ok(e.exit_code());
            }
        };

        let (workers_tx, workers_rx) = watch::channel(false);
        let (coordinator, pool, workers) = runtime.spawn_workers(workers_rx);

        println!("🚀 Starting export for {user}...");
        let job_id = match coordinator.submit_export(user).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "Failed to submit export");
                eprintln!("Failed to submit export: {e}");
                stop_workers(workers_tx, workers).await;
                return Ok(e.exit_code());
            }
        };
        println!("  Job: {job_id}");
        println!();

        let deadline = self.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
        let interrupted = wait_for_shutdown(shutdown_signal);
        tokio::pin!(interrupted);
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        let mut last_progress = String::new();

        let exit_code = loop {
            tokio::select! {
                _ = &mut interrupted => {
                    tracing::info!(job_id = %job_id, "Export interrupted by user signal");
                    if let Err(e) = coordinator.cancel(job_id).await {
                        tracing::error!(error = %e, "Failed to cancel export");
                    }
                    println!();
                    println!("⚠️  Export interrupted. Job {job_id} cancelled.");
                    break 130;
                }
                _ = ticker.tick() => {
                    let report = match coordinator.get_status(job_id).await {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to read export status");
                            eprintln!("Failed to read export status: {e}");
                            break e.exit_code();
                        }
                    };

                    let progress = progress_line(&report);
                    if progress != last_progress {
                        println!("{progress}");
                        last_progress = progress;
                    }

                    if report.is_terminal() {
                        break report_outcome(&report);
                    }

                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        tracing::warn!(job_id = %job_id, "Export timed out");
                        if let Err(e) = coordinator.cancel(job_id).await {
                            tracing::error!(error = %e, "Failed to cancel export");
                        }
                        println!();
                        println!("⏱️  Export timed out. Job {job_id} cancelled.");
                        break 1;
                    }
                }
            }
        };

        drop(pool);
        stop_workers(workers_tx, workers).await;
        Ok(exit_code)
    }
}

/// Resolves once a shutdown has been requested
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone: no signal can arrive any more
            std::future::pending::<()>().await;
        }
    }
}

async fn stop_workers(workers_tx: watch::Sender<bool>, workers: tokio::task::JoinHandle<()>) {
    let _ = workers_tx.send(true);
    if let Err(e) = workers.await {
        tracing::error!(error = %e, "Worker pool task failed");
    }
}

fn progress_line(report: &ExportStatusReport) -> String {
    format!(
        "  {}: {}/{} jobs complete, {} failed, {} books",
        report.status,
        report.counts.complete,
        report.counts.total,
        report.counts.failed,
        report.books
    )
}

fn report_outcome(report: &ExportStatusReport) -> i32 {
    println!();
    match report.status {
        ExportStatus::Complete => {
            println!("✅ Export completed successfully!");
            if let Some(location) = &report.archive_location {
                println!("  Archive: {location}");
            }
            if report.counts.failed > 0 {
                println!("  ⚠️  {} book(s) could not be exported", report.counts.failed);
            }
            0
        }
        ExportStatus::Cancelled => {
            println!("⚠️  Export was cancelled");
            1
        }
        _ => {
            println!("❌ Export failed");
            1
        }
    }
}
