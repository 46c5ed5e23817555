//! Run statistics and the outcome returned by `run_sync`

use crate::core::state::RunStatus;
use crate::domain::RecordFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Skip reason labels
pub mod skip {
    pub const UNCHANGED: &str = "unchanged";
    pub const MISSING_TIMESTAMPS: &str = "missing_timestamps";
    pub const MISSING_UNIQUE_ID: &str = "missing_unique_id";
    pub const INVALID_PRIMARY_KEY: &str = "invalid_primary_key";
    pub const PARENT_ID_MISSING: &str = "parent_id_missing";
    pub const PARENT_NOT_FOUND: &str = "parent_not_found";
    pub const PARENT_MISSING_CUSTOMER: &str = "parent_missing_customer";
}

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub created: u64,
    pub updated: u64,
    pub errored: u64,
    pub skipped: u64,

    /// Records seen after normalization (within the resume window, if any)
    pub total: u64,

    /// Skip counts by reason label
    #[serde(default)]
    pub skip_reasons: BTreeMap<String, u64>,
}

impl SyncStats {
    /// Count one skipped record under `reason`
    pub fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        *self.skip_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn skipped_for(&self, reason: &str) -> u64 {
        self.skip_reasons.get(reason).copied().unwrap_or(0)
    }

    pub fn written(&self) -> u64 {
        self.created + self.updated
    }

    /// Percentage of attempted writes that succeeded
    pub fn success_rate(&self) -> f64 {
        let attempted = self.written() + self.errored;
        if attempted == 0 {
            return 100.0;
        }
        (self.written() as f64 / attempted as f64) * 100.0
    }

    pub fn merge(&mut self, other: &SyncStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.errored += other.errored;
        self.skipped += other.skipped;
        self.total += other.total;
        for (reason, count) in &other.skip_reasons {
            *self.skip_reasons.entry(reason.clone()).or_insert(0) += count;
        }
    }
}

/// Resume window metadata for resumable entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub total: usize,
    pub completed_from: usize,
    pub completed_to: usize,
    pub next_offset: usize,
    pub has_more: bool,
}

impl ProgressInfo {
    /// Window `[offset, offset + page_size)` over a dataset of `total` rows
    pub fn window(total: usize, offset: usize, page_size: usize) -> Self {
        let completed_from = offset.min(total);
        let completed_to = offset.saturating_add(page_size).min(total);
        Self {
            total,
            completed_from,
            completed_to,
            next_offset: completed_to,
            has_more: completed_to < total,
        }
    }
}

/// Result of one `run_sync` invocation
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub success: bool,
    pub status: RunStatus,
    pub stats: SyncStats,
    pub progress: Option<ProgressInfo>,
    pub failures: Vec<RecordFailure>,
    pub error: Option<String>,
    pub duration: Duration,
    pub dry_run: bool,
}

impl SyncOutcome {
    pub fn log_summary(&self) {
        tracing::info!(
            status = %self.status,
            created = self.stats.created,
            updated = self.stats.updated,
            errored = self.stats.errored,
            skipped = self.stats.skipped,
            total = self.stats.total,
            duration_ms = self.duration.as_millis() as u64,
            success_rate = format!("{:.2}%", self.stats.success_rate()),
            dry_run = self.dry_run,
            "Sync finished"
        );

        for (reason, count) in &self.stats.skip_reasons {
            tracing::debug!(reason = %reason, count = count, "Skipped records");
        }

        if let Some(progress) = &self.progress {
            tracing::info!(
                total = progress.total,
                completed_from = progress.completed_from,
                completed_to = progress.completed_to,
                has_more = progress.has_more,
                "Resume window processed"
            );
        }

        for failure in &self.failures {
            tracing::warn!(unique_id = %failure.unique_id, error = %failure.error, "Record failed");
        }

        if let Some(error) = &self.error {
            tracing::error!(error = %error, "Sync failed");
        }
    }
}
