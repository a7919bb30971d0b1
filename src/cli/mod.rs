//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Shelfpack using clap.

pub mod commands;
pub mod runtime;

use clap::{Parser, Subcommand};

/// Shelfpack - account export orchestration
#[derive(Parser, Debug)]
#[command(name = "shelfpack")]
#[command(version, about, long_about = None)]
#[command(author = "Shelfpack Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "shelfpack.toml", env = "SHELFPACK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SHELFPACK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a user's account and wait for the archive
    Export(commands::export::ExportArgs),

    /// Show the status of an export job
    Status(commands::status::StatusArgs),

    /// Cancel a live export job
    Cancel(commands::cancel::CancelArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from(["shelfpack", "export", "--user", "reader"]);
        assert_eq!(cli.config, "shelfpack.toml");
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.user, "reader");
                assert!(args.timeout.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_export_requires_user() {
        assert!(Cli::try_parse_from(["shelfpack", "export"]).is_err());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from([
            "shelfpack",
            "--config",
            "custom.toml",
            "export",
            "--user",
            "reader",
        ]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["shelfpack", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from([
            "shelfpack",
            "status",
            "7d44b88c-4199-4bad-97dc-d78268e01398",
            "--json",
        ]);
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.job_id, "7d44b88c-4199-4bad-97dc-d78268e01398");
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_cancel() {
        let cli = Cli::parse_from(["shelfpack", "cancel", "7d44b88c-4199-4bad-97dc-d78268e01398"]);
        assert!(matches!(cli.command, Commands::Cancel(_)));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["shelfpack", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["shelfpack", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
