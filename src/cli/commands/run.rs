//! Scheduler daemon
//!
//! Each enabled integration with a schedule gets its own task ticking on its
//! interval. A task awaits its run before the next tick, so runs of one
//! integration never overlap. A shutdown signal stops every loop once the
//! run in flight has finished.

use super::{build_coordinator, EXIT_CONFIG, EXIT_CONNECTION, EXIT_SUCCESS};
use crate::config::{load_config, IntegrationConfig};
use crate::core::sync::{SyncCoordinator, SyncOptions};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Classify and report without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Integrations the scheduler drives, with their intervals
pub fn scheduled_integrations(integrations: &[IntegrationConfig]) -> Vec<(&IntegrationConfig, Duration)> {
    integrations
        .iter()
        .filter(|i| i.enabled)
        .filter_map(|i| i.schedule_interval().map(|every| (i, every)))
        .collect()
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let schedule: Vec<_> = scheduled_integrations(&config.integrations)
            .into_iter()
            .map(|(integration, every)| (integration.id.clone(), every))
            .collect();

        if schedule.is_empty() {
            println!("No enabled integration has a schedule; nothing to run.");
            return Ok(EXIT_SUCCESS);
        }

        let dry_run = self.dry_run || config.application.dry_run;
        let coordinator = match build_coordinator(Arc::clone(&config)).await {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize scheduler");
                eprintln!("Failed to initialize scheduler: {e}");
                return Ok(EXIT_CONNECTION);
            }
        };

        println!("⏱️  Scheduling {} integration(s)", schedule.len());
        let mut handles = Vec::with_capacity(schedule.len());
        for (integration_id, every) in schedule {
            tracing::info!(
                integration_id = %integration_id,
                every_secs = every.as_secs(),
                "Integration scheduled"
            );
            let coordinator = Arc::clone(&coordinator);
            let shutdown = shutdown_signal.clone();
            handles.push(tokio::spawn(async move {
                schedule_loop(coordinator, integration_id, every, dry_run, shutdown).await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Scheduler task panicked");
            }
        }

        tracing::info!("Scheduler stopped");
        Ok(EXIT_SUCCESS)
    }
}

async fn schedule_loop(
    coordinator: Arc<SyncCoordinator>,
    integration_id: crate::domain::IntegrationId,
    every: Duration,
    dry_run: bool,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        let mut options = SyncOptions::scheduled();
        if dry_run {
            options = options.dry_run();
        }

        if let Err(e) = coordinator.run_sync(&integration_id, options).await {
            tracing::error!(integration_id = %integration_id, error = %e, "Scheduled run failed");
        }
    }

    tracing::info!(integration_id = %integration_id, "Schedule loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integration(id: &str, schedule: Option<&str>, enabled: bool) -> IntegrationConfig {
        let schedule = schedule
            .map(|s| format!("schedule = \"{s}\""))
            .unwrap_or_default();
        toml::from_str(&format!(
            r#"
            id = "{id}"
            entity = "contract"
            connection = "main"
            remote_object = "INST"
            remote_table = "INST"
            fields = ["INST", "INSDATE", "UPDDATE"]
            unique_remote_field = "INST"
            unique_local_field = "erp_id"
            enabled = {enabled}
            {schedule}

            [field_mapping]
            INST = "erp_id"
            "#
        ))
        .unwrap()
    }

    #[test]
    fn test_only_enabled_scheduled_integrations_run() {
        let integrations = vec![
            integration("contracts", Some("15m"), true),
            integration("items", None, true),
            integration("payments", Some("1h"), false),
        ];

        let scheduled = scheduled_integrations(&integrations);
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].0.id.as_str(), "contracts");
        assert_eq!(scheduled[0].1, Duration::from_secs(900));
    }
}
