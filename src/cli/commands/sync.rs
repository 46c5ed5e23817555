//! Sync command implementation
//!
//! Runs one sync of one integration and maps the outcome to an exit code.

use super::{
    build_coordinator, exit_code_for_error, exit_code_for_status, EXIT_CONFIG, EXIT_CONNECTION,
};
use crate::config::load_config;
use crate::core::sync::SyncOptions;
use crate::domain::IntegrationId;
use clap::Args;
use std::sync::Arc;

/// Arguments for the sync command
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Integration to run
    #[arg(short, long)]
    pub integration: String,

    /// Run as a scheduled trigger (enables incremental strategies)
    #[arg(long)]
    pub scheduled: bool,

    /// Restrict a child entity to these parent ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub parent_ids: Vec<String>,

    /// Restrict a child entity to parents synced in the last N months
    #[arg(long, value_name = "N")]
    pub recent_parent_months: Option<u32>,

    /// Start the resume window at this offset
    #[arg(long, value_name = "N")]
    pub resume_offset: Option<usize>,

    /// Resume window size
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Delete every local record of the entity and reload from the ERP
    #[arg(long)]
    pub full_sync: bool,

    /// Classify and report without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    /// Options for the coordinator
    pub fn options(&self, config_dry_run: bool) -> SyncOptions {
        let mut options = if self.scheduled {
            SyncOptions::scheduled()
        } else {
            SyncOptions::manual()
        };

        if !self.parent_ids.is_empty() {
            options = options.with_parent_ids(self.parent_ids.iter().map(|s| s.trim()));
        }
        if let Some(months) = self.recent_parent_months {
            options = options.with_recent_parent_months(months);
        }
        if let Some(offset) = self.resume_offset {
            options = options.with_resume_offset(offset);
        }
        if let Some(page_size) = self.page_size {
            options = options.with_page_size(page_size);
        }
        if self.full_sync {
            options = options.full_sync();
        }
        if self.dry_run || config_dry_run {
            options = options.dry_run();
        }
        options
    }

    /// Execute the sync command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let integration_id: IntegrationId = match self.integration.parse() {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Invalid integration id: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!(error = %e, "Configuration load failed");
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        if config.integration(&integration_id).is_none() {
            eprintln!("Unknown integration '{integration_id}'");
            return Ok(EXIT_CONFIG);
        }

        let options = self.options(config.application.dry_run);
        if options.dry_run {
            println!("🔍 DRY RUN MODE - nothing will be written");
        }

        let coordinator = match build_coordinator(config).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize sync");
                eprintln!("Failed to initialize sync: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        println!("🚀 Syncing {integration_id}...");
        let outcome = match coordinator.run_sync(&integration_id, options).await {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("Sync failed: {e}");
                return Ok(exit_code_for_error(&e));
            }
        };

        println!();
        println!("📊 Sync Summary ({}):", outcome.status);
        println!("  Total:   {}", outcome.stats.total);
        println!("  Created: {}", outcome.stats.created);
        println!("  Updated: {}", outcome.stats.updated);
        println!("  Skipped: {}", outcome.stats.skipped);
        println!("  Errored: {}", outcome.stats.errored);
        for (reason, count) in &outcome.stats.skip_reasons {
            println!("    {reason}: {count}");
        }
        if let Some(progress) = &outcome.progress {
            println!(
                "  Window:  {}..{} of {}{}",
                progress.completed_from,
                progress.completed_to,
                progress.total,
                if progress.has_more { " (more pending)" } else { "" }
            );
        }
        println!("  Duration: {:.2}s", outcome.duration.as_secs_f64());

        if !outcome.failures.is_empty() {
            println!();
            println!("⚠️  Failed records:");
            for failure in outcome.failures.iter().take(10) {
                println!("  - {}: {}", failure.unique_id, failure.error);
            }
            if outcome.failures.len() > 10 {
                println!("  ... and {} more", outcome.failures.len() - 10);
            }
        }

        Ok(exit_code_for_status(outcome.status))
    }
}
