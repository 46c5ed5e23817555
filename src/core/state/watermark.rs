//! Sync watermark per integration
//!
//! The watermark records when the last non-failed run of an integration
//! finished. Its absence means the next run is a first sync.

use crate::core::state::execution::RunStatus;
use crate::domain::{EntityKind, IntegrationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Watermark for one integration
///
/// # Examples
///
/// ```
/// use parksync::core::state::{RunStatus, WatermarkBuilder};
/// use parksync::domain::{EntityKind, IntegrationId};
/// use std::str::FromStr;
///
/// let id = IntegrationId::from_str("softone-contracts").unwrap();
/// let watermark = WatermarkBuilder::new(id, EntityKind::Contract)
///     .records_synced(100)
///     .build();
///
/// assert_eq!(watermark.records_synced, 100);
/// assert_eq!(watermark.last_run_status, RunStatus::Success);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub integration_id: IntegrationId,

    pub entity: EntityKind,

    /// End time of the last non-failed run; incremental runs fetch changes since this
    pub synced_through: DateTime<Utc>,

    pub last_run_started_at: DateTime<Utc>,

    pub last_run_completed_at: DateTime<Utc>,

    /// Success or partial
    pub last_run_status: RunStatus,

    /// Records created or updated across all runs
    pub records_synced: u64,
}

impl Watermark {
    /// Moves the watermark forward after a run that did not fail outright
    ///
    /// The stored time never moves backwards, even if the clock does.
    pub fn advance(
        &mut self,
        run_started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        status: RunStatus,
        records_written: u64,
    ) {
        self.synced_through = self.synced_through.max(completed_at);
        self.last_run_started_at = run_started_at;
        self.last_run_completed_at = completed_at;
        self.last_run_status = status;
        self.records_synced += records_written;
    }

    /// Duration of the last run
    pub fn last_run_duration(&self) -> chrono::Duration {
        self.last_run_completed_at - self.last_run_started_at
    }
}

/// Builder for creating Watermark instances
pub struct WatermarkBuilder {
    integration_id: IntegrationId,
    entity: EntityKind,
    synced_through: Option<DateTime<Utc>>,
    last_run_started_at: Option<DateTime<Utc>>,
    last_run_completed_at: Option<DateTime<Utc>>,
    last_run_status: RunStatus,
    records_synced: u64,
}

impl WatermarkBuilder {
    pub fn new(integration_id: IntegrationId, entity: EntityKind) -> Self {
        Self {
            integration_id,
            entity,
            synced_through: None,
            last_run_started_at: None,
            last_run_completed_at: None,
            last_run_status: RunStatus::Success,
            records_synced: 0,
        }
    }

    pub fn synced_through(mut self, timestamp: DateTime<Utc>) -> Self {
        self.synced_through = Some(timestamp);
        self
    }

    pub fn last_run_started_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.last_run_started_at = Some(timestamp);
        self
    }

    pub fn last_run_completed_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.last_run_completed_at = Some(timestamp);
        self
    }

    pub fn last_run_status(mut self, status: RunStatus) -> Self {
        self.last_run_status = status;
        self
    }

    pub fn records_synced(mut self, count: u64) -> Self {
        self.records_synced = count;
        self
    }

    /// Build the Watermark; unset times default to now
    pub fn build(self) -> Watermark {
        let now = Utc::now();
        let completed = self.last_run_completed_at.unwrap_or(now);

        Watermark {
            integration_id: self.integration_id,
            entity: self.entity,
            synced_through: self.synced_through.unwrap_or(completed),
            last_run_started_at: self.last_run_started_at.unwrap_or(completed),
            last_run_completed_at: completed,
            last_run_status: self.last_run_status,
            records_synced: self.records_synced,
        }
    }
}
