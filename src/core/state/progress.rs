//! Resume progress for long-running entity types
//!
//! A progress record is keyed by `(job type, integration id, entity type)` and
//! holds the offset of the next unprocessed record in the key-ordered remote
//! dataset. A missing record means offset 0.

use crate::domain::{EntityKind, IntegrationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job type under which the sync engine stores its progress
pub const SYNC_JOB_TYPE: &str = "erp_sync";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeProgress {
    pub job_type: String,
    pub integration_id: IntegrationId,
    pub entity: EntityKind,

    /// Next offset to process; never greater than `total`
    pub offset: usize,

    /// Dataset size observed by the run that wrote this record
    pub total: usize,

    pub updated_at: DateTime<Utc>,
}

impl ResumeProgress {
    /// Creates a progress record, clamping `offset` to `total`
    pub fn new(integration_id: IntegrationId, entity: EntityKind, offset: usize, total: usize) -> Self {
        Self {
            job_type: SYNC_JOB_TYPE.to_string(),
            integration_id,
            entity,
            offset: offset.min(total),
            total,
            updated_at: Utc::now(),
        }
    }

    /// Whether the whole dataset has been consumed
    pub fn is_complete(&self) -> bool {
        self.offset >= self.total
    }

    /// Share of the dataset processed, in percent
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.offset as f64 / self.total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_offset_clamped_to_total() {
        let id = IntegrationId::from_str("softone-contract-lines").unwrap();
        let progress = ResumeProgress::new(id, EntityKind::ContractLine, 12_000, 10_000);
        assert_eq!(progress.offset, 10_000);
        assert!(progress.is_complete());
        assert_eq!(progress.job_type, SYNC_JOB_TYPE);
    }

    #[test]
    fn test_percent_complete() {
        let id = IntegrationId::from_str("softone-items").unwrap();
        let progress = ResumeProgress::new(id, EntityKind::Item, 2_500, 10_000);
        assert!(!progress.is_complete());
        assert!((progress.percent_complete() - 25.0).abs() < f64::EPSILON);
    }
}
