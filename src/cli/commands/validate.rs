//! Validate config command implementation

use super::{EXIT_CONFIG, EXIT_SUCCESS};
use crate::config::load_config;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Run Timeout: {}s", config.sync.run_timeout_secs);
        println!("  Resume Page Size: {}", config.sync.resume_page_size);
        println!(
            "  PostgreSQL: {}",
            config
                .postgresql
                .connection_string
                .expose_secret()
                .as_str()
                .rsplit('@')
                .next()
                .unwrap_or("***")
        );

        println!("  Connections:");
        for connection in &config.connections {
            println!("    - {} ({})", connection.name, connection.base_url);
        }

        println!("  Integrations:");
        for integration in &config.integrations {
            println!(
                "    - {} [{}] {} via {}{}{}",
                integration.id,
                integration.entity,
                integration.remote_table,
                integration.connection,
                integration
                    .schedule
                    .as_deref()
                    .map(|s| format!(", every {s}"))
                    .unwrap_or_default(),
                if integration.enabled { "" } else { " (disabled)" }
            );
        }
        println!();
        Ok(EXIT_SUCCESS)
    }
}
