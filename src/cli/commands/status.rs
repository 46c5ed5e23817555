//! Status command implementation
//!
//! Prints watermarks, pending resume records and the latest execution log
//! entries.

use super::{EXIT_CONFIG, EXIT_CONNECTION, EXIT_FAILURE, EXIT_SUCCESS};
use crate::adapters::database::create_store_and_state;
use crate::config::load_config;
use crate::core::state::StateManager;
use crate::domain::IntegrationId;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Only show this integration
    #[arg(short, long)]
    pub integration: Option<String>,

    /// Number of execution log entries to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking sync status");

        let filter: Option<IntegrationId> = match self.integration.as_deref().map(str::parse) {
            None => None,
            Some(Ok(id)) => Some(id),
            Some(Err(e)) => {
                eprintln!("Invalid integration id: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let state = match create_store_and_state(&config).await {
            Ok((_, state)) => StateManager::new_with_storage(state),
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        let matches = |id: &IntegrationId| filter.as_ref().map_or(true, |f| f == id);

        let (watermarks, progress, executions) = match tokio::try_join!(
            state.get_all_watermarks(),
            state.list_progress(),
            state.recent_executions(filter.as_ref(), self.limit),
        ) {
            Ok(loaded) => loaded,
            Err(e) => {
                println!("❌ Failed to load sync state");
                println!("   Error: {e}");
                return Ok(EXIT_FAILURE);
            }
        };

        println!("📊 Watermarks");
        println!(
            "{:<28} {:<14} {:<10} {:<10} {:<20}",
            "Integration", "Entity", "Status", "Records", "Synced Through"
        );
        println!("{}", "-".repeat(86));
        let mut shown = 0;
        for watermark in watermarks.iter().filter(|w| matches(&w.integration_id)) {
            shown += 1;
            println!(
                "{:<28} {:<14} {:<10} {:<10} {:<20}",
                watermark.integration_id.as_str(),
                watermark.entity.as_str(),
                watermark.last_run_status.as_str(),
                watermark.records_synced,
                watermark.synced_through.format("%Y-%m-%d %H:%M:%S")
            );
        }
        if shown == 0 {
            println!("No sync history found. Run 'parksync sync --integration <ID>' first.");
        }

        let pending: Vec<_> = progress
            .iter()
            .filter(|p| matches(&p.integration_id))
            .collect();
        if !pending.is_empty() {
            println!();
            println!("🔄 Pending resume windows");
            for record in pending {
                println!(
                    "  {} ({}): {}/{} ({:.1}%)",
                    record.integration_id,
                    record.entity,
                    record.offset,
                    record.total,
                    record.percent_complete()
                );
            }
        }

        if !executions.is_empty() {
            println!();
            println!("🧾 Recent runs");
            for entry in &executions {
                println!(
                    "  {} {:<28} {:<10} {:<9} +{} ~{} !{} skip {}{}",
                    entry.started_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.integration_id.as_str(),
                    entry.trigger.as_str(),
                    entry.status.as_str(),
                    entry.stats.created,
                    entry.stats.updated,
                    entry.stats.errored,
                    entry.stats.skipped,
                    entry
                        .error
                        .as_deref()
                        .map(|e| format!("  ({e})"))
                        .unwrap_or_default()
                );
            }
        }

        println!();
        Ok(EXIT_SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_status_args_parse_filter() {
        let cli = Cli::parse_from(["parksync", "status", "--integration", "contracts"]);
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.integration.as_deref(), Some("contracts"));
                assert_eq!(args.limit, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
