//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for ParkSync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// ParkSync - Parking facility ERP synchronization engine
#[derive(Parser, Debug)]
#[command(name = "parksync")]
#[command(version, about, long_about = None)]
#[command(author = "ParkSync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "parksync.toml", env = "PARKSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PARKSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sync of an integration
    Sync(commands::sync::SyncArgs),

    /// Run every scheduled integration until interrupted
    Run(commands::run::RunArgs),

    /// Show watermarks, pending resume windows and recent runs
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_sync() {
        let cli = Cli::parse_from(["parksync", "sync", "--integration", "contracts"]);
        assert_eq!(cli.config, "parksync.toml");
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.integration, "contracts");
                assert!(!args.scheduled);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_sync_flags() {
        let cli = Cli::parse_from([
            "parksync",
            "sync",
            "-i",
            "contract-lines",
            "--scheduled",
            "--parent-ids",
            "3018,3019",
            "--resume-offset",
            "5000",
            "--dry-run",
        ]);
        match cli.command {
            Commands::Sync(args) => {
                assert!(args.scheduled);
                assert!(args.dry_run);
                assert_eq!(args.parent_ids, vec!["3018", "3019"]);
                assert_eq!(args.resume_offset, Some(5000));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["parksync", "--config", "custom.toml", "run"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["parksync", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_sync_requires_integration() {
        assert!(Cli::try_parse_from(["parksync", "sync"]).is_err());
    }
}
