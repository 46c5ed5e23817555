//! Database abstraction traits
//!
//! [`EntityStore`] holds the synced ERP records; [`StateStorage`] holds
//! watermarks, resume progress and the execution log. Both are implemented
//! by the PostgreSQL adapter and by the in-memory store.

use crate::core::state::{ExecutionLogEntry, ResumeProgress, Watermark};
use crate::domain::{EntityKind, ExistingRecord, IntegrationId, LocalRecord, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Maximum number of values a single "find by unique value in list" call accepts
pub const MAX_IN_LIST: usize = 1000;

/// Storage for synchronized entity records
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Test the database connection
    async fn test_connection(&self) -> Result<()>;

    /// Records of `kind` whose unique value is in `values`
    ///
    /// Callers must pass at most [`MAX_IN_LIST`] values per call.
    async fn find_by_unique_values(
        &self,
        kind: EntityKind,
        values: &[String],
    ) -> Result<Vec<ExistingRecord>>;

    /// One page of every record of `kind`, ordered by primary key
    async fn page_all(
        &self,
        kind: EntityKind,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ExistingRecord>>;

    async fn count(&self, kind: EntityKind) -> Result<u64>;

    /// Insert-or-update every record keyed by primary key, atomically
    ///
    /// Either all records are written or none is.
    async fn upsert_batch(&self, records: &[LocalRecord]) -> Result<()>;

    /// Insert-or-update a single record keyed by primary key
    async fn upsert_one(&self, record: &LocalRecord) -> Result<()>;

    /// First record of `kind` carrying `unique_value`
    async fn find_by_unique(
        &self,
        kind: EntityKind,
        unique_value: &str,
    ) -> Result<Option<ExistingRecord>>;

    /// Insert a new record
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if the primary key is taken.
    async fn insert(&self, record: &LocalRecord) -> Result<()>;

    /// Overwrite the record of `record.kind` stored under `pk`
    async fn update_by_pk(&self, pk: i64, record: &LocalRecord) -> Result<()>;

    /// Delete every record of `kind`, returning the number removed
    async fn delete_all(&self, kind: EntityKind) -> Result<u64>;

    /// Records of `kind` written at or after `since`
    async fn synced_since(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExistingRecord>>;
}

/// State storage for watermarks, resume progress and the execution log
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Returns `Ok(None)` if the integration has never completed a run
    async fn load_watermark(&self, integration_id: &IntegrationId) -> Result<Option<Watermark>>;

    /// Upsert the watermark of `watermark.integration_id`
    async fn save_watermark(&self, watermark: &Watermark) -> Result<()>;

    async fn get_all_watermarks(&self) -> Result<Vec<Watermark>>;

    async fn load_progress(
        &self,
        job_type: &str,
        integration_id: &IntegrationId,
        entity: EntityKind,
    ) -> Result<Option<ResumeProgress>>;

    /// Upsert a progress record
    async fn save_progress(&self, progress: &ResumeProgress) -> Result<()>;

    /// Delete a progress record; deleting a missing record is not an error
    async fn clear_progress(
        &self,
        job_type: &str,
        integration_id: &IntegrationId,
        entity: EntityKind,
    ) -> Result<()>;

    async fn list_progress(&self) -> Result<Vec<ResumeProgress>>;

    async fn append_execution_log(&self, entry: &ExecutionLogEntry) -> Result<()>;

    /// Latest entries, newest first, optionally for one integration
    async fn recent_execution_logs(
        &self,
        integration_id: Option<&IntegrationId>,
        limit: usize,
    ) -> Result<Vec<ExecutionLogEntry>>;
}
