//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "shelfpack.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Shelfpack configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Point catalog.base_url at the host application's API");
                println!("  3. Create a .env file with your credentials:");
                println!("     - Set SHELFPACK_CATALOG_TOKEN (if auth_type = \"bearer\")");
                println!("     - Set SHELFPACK_DATABASE_URL (if using PostgreSQL)");
                println!("     - Set SHELFPACK_S3_KEY_ID and SHELFPACK_S3_SECRET (if using S3)");
                println!("  4. Run: shelfpack validate-config -c {}", self.output);
                println!();
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to write configuration file");
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Smallest configuration that loads without any environment variables
    pub fn generate_minimal_config() -> String {
        r#"# Shelfpack Configuration

environment = "development"
database_target = "memory"

[application]
log_level = "info"

[storage]
backend = "local"

[storage.local]
root = "./shelfpack-data"

[catalog]
base_url = "http://localhost:8000/api"
auth_type = "none"
# auth_type = "bearer"
# api_token = "${SHELFPACK_CATALOG_TOKEN}"

[workers]
concurrency = 8
queue_name = "imports"

[logging]
local_enabled = true
local_path = "./logs"
"#
        .to_string()
    }

    /// Every section, with comments and placeholder credentials
    pub fn generate_config_with_examples() -> String {
        r#"# Shelfpack Configuration File
#
# Values of the form ${VAR} are read from the environment (or .env).
# Any key can also be overridden with SHELFPACK_<SECTION>_<KEY>,
# e.g. SHELFPACK_WORKERS_CONCURRENCY=32.

# development, staging or production
environment = "production"

# Job store: "memory" (single process) or "postgresql" (shared)
database_target = "postgresql"

[application]
# trace, debug, info, warn, error
log_level = "info"

[storage]
# "local" or "s3"; archives and exported images live here
backend = "s3"

[storage.local]
root = "./shelfpack-data"

[storage.s3]
bucket = "account-exports"
region = "eu-west-1"
# endpoint = "http://localhost:9000"   # S3-compatible services
access_key_id = "${SHELFPACK_S3_KEY_ID}"
secret_access_key = "${SHELFPACK_S3_SECRET}"
allow_http = false
# Part size for multipart archive uploads
multipart_chunk_size_mb = 8
max_concurrency = 4

[postgresql]
connection_string = "${SHELFPACK_DATABASE_URL}"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60
# Connections are plaintext; terminate TLS in a proxy or sidecar
ssl_mode = "disable"

[catalog]
base_url = "https://books.example/api"
# basic, bearer or none
auth_type = "bearer"
api_token = "${SHELFPACK_CATALOG_TOKEN}"
# username = "exporter"
# password = "${SHELFPACK_CATALOG_PASSWORD}"
tls_verify = true
timeout_seconds = 30

[catalog.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[workers]
# Tasks executing at once
concurrency = 16
queue_name = "imports"
# Time allowed for running tasks to finish on shutdown
shutdown_timeout_secs = 30

[logging]
local_enabled = true
local_path = "/var/log/shelfpack"
# daily or size
local_rotation = "daily"
local_max_size_mb = 100
"#
        .to_string()
    }
}
