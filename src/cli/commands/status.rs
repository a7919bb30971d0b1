//! Status command implementation
//!
//! This module implements the `status` command, which reads one export job
//! and its children from the configured job store.

use crate::cli::runtime::open_jobs;
use crate::config::load_config;
use crate::core::export::ExportStatusReport;
use crate::domain::{JobId, ShelfpackError};
use clap::Args;
use std::str::FromStr;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Export job id
    pub job_id: String,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(job_id = %self.job_id, "Checking export status");

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
        let children = match jobs.children(job_id).await {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load child jobs");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        let report = ExportStatusReport::new(&export, &children);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("📊 Export Status");
            println!();
            println!("{report}");
            println!();
            println!("  Created: {}", report.created_at.to_rfc3339());
            println!("  Updated: {}", report.updated_at.to_rfc3339());
        }

        Ok(0)
    }
}
