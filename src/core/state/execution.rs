//! Execution log entries
//!
//! One immutable entry per sync invocation, written whether the run
//! succeeded, partially succeeded or failed.

use crate::core::sync::options::SyncTrigger;
use crate::core::sync::summary::SyncStats;
use crate::domain::{EntityKind, IntegrationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Outcome of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every queued record was written
    Success,
    /// Some records were written and some errored
    Partial,
    /// The run aborted or nothing could be written
    Failed,
}

impl RunStatus {
    /// Derives the status of a run that reached the persistence step
    pub fn from_stats(stats: &SyncStats) -> Self {
        let written = stats.created + stats.updated;
        match (written, stats.errored) {
            (_, 0) => RunStatus::Success,
            (0, _) => RunStatus::Failed,
            _ => RunStatus::Partial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(RunStatus::Success),
            "partial" => Some(RunStatus::Partial),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one sync invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub id: Uuid,
    pub integration_id: IntegrationId,
    pub entity: EntityKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: RunStatus,
    pub trigger: SyncTrigger,
    pub stats: SyncStats,
    pub error: Option<String>,

    /// Free-form diagnostics: remote object, direction, strategy, skip reasons
    pub details: Value,
}

impl ExecutionLogEntry {
    /// Builds an entry for a run that started at `started_at` and ends now
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        integration_id: IntegrationId,
        entity: EntityKind,
        started_at: DateTime<Utc>,
        status: RunStatus,
        trigger: SyncTrigger,
        stats: SyncStats,
        error: Option<String>,
        details: Value,
    ) -> Self {
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        Self {
            id: Uuid::new_v4(),
            integration_id,
            entity,
            started_at,
            finished_at,
            duration_ms,
            status,
            trigger,
            stats,
            error,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(created: u64, updated: u64, errored: u64) -> SyncStats {
        SyncStats {
            created,
            updated,
            errored,
            ..SyncStats::default()
        }
    }

    #[test]
    fn test_status_from_stats() {
        assert_eq!(RunStatus::from_stats(&stats(2, 1, 0)), RunStatus::Success);
        assert_eq!(RunStatus::from_stats(&stats(0, 0, 0)), RunStatus::Success);
        assert_eq!(RunStatus::from_stats(&stats(2, 0, 1)), RunStatus::Partial);
        assert_eq!(RunStatus::from_stats(&stats(0, 0, 3)), RunStatus::Failed);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [RunStatus::Success, RunStatus::Partial, RunStatus::Failed] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("running"), None);
    }
}
