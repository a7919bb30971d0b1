//! Cancel command implementation

use crate::cli::runtime::open_jobs;
use crate::config::load_config;
use crate::domain::{JobId, ShelfpackError, StopReason};
use clap::Args;
use std::str::FromStr;

/// Arguments for the cancel command
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Export job id
    pub job_id: String,
}

impl CancelArgs {
    /// Execute the cancel command
    ///
    /// Exits with 1 when the job was already terminal.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let job_id = match JobId::from_str(&self.job_id) {
            Ok(id) => id,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let jobs = match open_jobs(&config).await {
            Ok(j) => j,
            Err(e) => {
                println!("❌ Failed to connect to job store");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let export = match jobs.export(job_id).await {
            Ok(export) => export,
            Err(ShelfpackError::JobNotFound(_)) => {
                println!("❌ No export job {job_id}");
                return Ok(1);
            }
            Err(e) => {
                println!("❌ Failed to load export job");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if jobs
            .mark_stopped(job_id, StopReason::Cancelled, None)
            .await?
        {
            tracing::info!(job_id = %job_id, "Export cancelled");
            println!("✅ Export {job_id} cancelled");
            Ok(0)
        } else {
            println!(
                "⚠️  Export {job_id} is already {}",
                crate::domain::ExportStatus::from(export.job.status)
            );
            Ok(1)
        }
    }
}
