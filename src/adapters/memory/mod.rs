//! In-memory storage backend
//!
//! Implements [`EntityStore`] and [`StateStorage`] over mutex-guarded maps.
//! Used by tests and for local experiments; it mirrors the PostgreSQL
//! adapter's semantics, including atomic batches that reject two rows with
//! the same primary key. Writes can be made to fail for chosen unique values
//! to exercise the partial-failure paths.

use crate::adapters::database::traits::{EntityStore, StateStorage};
use crate::core::state::{ExecutionLogEntry, ResumeProgress, Watermark};
use crate::domain::{
    EntityKind, ExistingRecord, IntegrationId, LocalRecord, Result, StoreError, SyncError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredRecord {
    record: LocalRecord,
    synced_at: DateTime<Utc>,
}

impl StoredRecord {
    fn summary(&self) -> ExistingRecord {
        ExistingRecord {
            pk: self.record.pk,
            unique_value: self.record.unique_value.clone(),
            customer_ref: self.record.customer_ref.clone(),
            fingerprint: Some(self.record.fingerprint.clone()),
            synced_at: self.synced_at,
        }
    }
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<(EntityKind, i64), StoredRecord>,
    watermarks: BTreeMap<String, Watermark>,
    progress: BTreeMap<(String, String, EntityKind), ResumeProgress>,
    executions: Vec<ExecutionLogEntry>,
    failing_values: HashSet<String>,
    transient_failures: HashMap<String, usize>,
    batch_writes: usize,
    single_writes: usize,
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write of a record with this unique value fails permanently
    pub fn fail_writes_for(&self, unique_value: impl Into<String>) {
        self.lock().failing_values.insert(unique_value.into());
    }

    /// The next `times` writes of this unique value fail with a lock timeout
    pub fn fail_transiently_for(&self, unique_value: impl Into<String>, times: usize) {
        self.lock()
            .transient_failures
            .insert(unique_value.into(), times);
    }

    /// Seeds a record as if an earlier run had written it
    pub fn seed(&self, record: LocalRecord) {
        self.seed_at(record, Utc::now());
    }

    /// Seeds a record with an explicit sync time
    pub fn seed_at(&self, record: LocalRecord, synced_at: DateTime<Utc>) {
        self.lock()
            .records
            .insert((record.kind, record.pk), StoredRecord { record, synced_at });
    }

    /// Stored record by primary key
    pub fn get(&self, kind: EntityKind, pk: i64) -> Option<LocalRecord> {
        self.lock()
            .records
            .get(&(kind, pk))
            .map(|stored| stored.record.clone())
    }

    /// All stored records of a kind, ordered by primary key
    pub fn records(&self, kind: EntityKind) -> Vec<LocalRecord> {
        self.lock()
            .records
            .values()
            .filter(|stored| stored.record.kind == kind)
            .map(|stored| stored.record.clone())
            .collect()
    }

    /// Number of `upsert_batch` calls that reached the store
    pub fn batch_writes(&self) -> usize {
        self.lock().batch_writes
    }

    /// Number of single-record writes that reached the store
    pub fn single_writes(&self) -> usize {
        self.lock().single_writes
    }

    pub fn execution_logs(&self) -> Vec<ExecutionLogEntry> {
        self.lock().executions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-write; the maps are still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn check_writable(&mut self, record: &LocalRecord) -> Result<()> {
        if self.failing_values.contains(&record.unique_value) {
            return Err(StoreError::WriteFailed(format!(
                "value too long for column (record {})",
                record.unique_value
            ))
            .into());
        }
        if let Some(remaining) = self.transient_failures.get_mut(&record.unique_value) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::LockTimeout(format!(
                    "lock wait timeout on record {}",
                    record.unique_value
                ))
                .into());
            }
        }
        Ok(())
    }

    fn put(&mut self, record: &LocalRecord, pk: i64) {
        let mut stored = record.clone();
        stored.pk = pk;
        self.records.insert(
            (record.kind, pk),
            StoredRecord {
                record: stored,
                synced_at: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn find_by_unique_values(
        &self,
        kind: EntityKind,
        values: &[String],
    ) -> Result<Vec<ExistingRecord>> {
        let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
        Ok(self
            .lock()
            .records
            .values()
            .filter(|s| s.record.kind == kind && wanted.contains(s.record.unique_value.as_str()))
            .map(StoredRecord::summary)
            .collect())
    }

    async fn page_all(
        &self,
        kind: EntityKind,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ExistingRecord>> {
        Ok(self
            .lock()
            .records
            .values()
            .filter(|s| s.record.kind == kind)
            .skip(offset)
            .take(limit)
            .map(StoredRecord::summary)
            .collect())
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        Ok(self
            .lock()
            .records
            .values()
            .filter(|s| s.record.kind == kind)
            .count() as u64)
    }

    async fn upsert_batch(&self, records: &[LocalRecord]) -> Result<()> {
        let mut inner = self.lock();
        inner.batch_writes += 1;

        let mut seen = HashSet::new();
        for record in records {
            if !seen.insert((record.kind, record.pk)) {
                return Err(StoreError::WriteFailed(format!(
                    "ON CONFLICT DO UPDATE command cannot affect row a second time (pk {})",
                    record.pk
                ))
                .into());
            }
            inner.check_writable(record)?;
        }
        for record in records {
            inner.put(record, record.pk);
        }
        Ok(())
    }

    async fn upsert_one(&self, record: &LocalRecord) -> Result<()> {
        let mut inner = self.lock();
        inner.single_writes += 1;
        inner.check_writable(record)?;
        inner.put(record, record.pk);
        Ok(())
    }

    async fn find_by_unique(
        &self,
        kind: EntityKind,
        unique_value: &str,
    ) -> Result<Option<ExistingRecord>> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|s| s.record.kind == kind && s.record.unique_value == unique_value)
            .map(StoredRecord::summary))
    }

    async fn insert(&self, record: &LocalRecord) -> Result<()> {
        let mut inner = self.lock();
        inner.single_writes += 1;
        inner.check_writable(record)?;
        if inner.records.contains_key(&(record.kind, record.pk)) {
            return Err(SyncError::Store(StoreError::DuplicateKey(format!(
                "synced_records_pkey ({}, {})",
                record.kind, record.pk
            ))));
        }
        inner.put(record, record.pk);
        Ok(())
    }

    async fn update_by_pk(&self, pk: i64, record: &LocalRecord) -> Result<()> {
        let mut inner = self.lock();
        inner.single_writes += 1;
        inner.check_writable(record)?;
        if !inner.records.contains_key(&(record.kind, pk)) {
            return Err(StoreError::WriteFailed(format!(
                "no {} record with pk {pk}",
                record.kind
            ))
            .into());
        }
        inner.put(record, pk);
        Ok(())
    }

    async fn delete_all(&self, kind: EntityKind) -> Result<u64> {
        let mut inner = self.lock();
        let before = inner.records.len();
        inner.records.retain(|(k, _), _| *k != kind);
        Ok((before - inner.records.len()) as u64)
    }

    async fn synced_since(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExistingRecord>> {
        Ok(self
            .lock()
            .records
            .values()
            .filter(|s| s.record.kind == kind && s.synced_at >= since)
            .map(StoredRecord::summary)
            .collect())
    }
}

#[async_trait]
impl StateStorage for MemoryStore {
    async fn load_watermark(&self, integration_id: &IntegrationId) -> Result<Option<Watermark>> {
        Ok(self.lock().watermarks.get(integration_id.as_str()).cloned())
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<()> {
        self.lock()
            .watermarks
            .insert(watermark.integration_id.to_string(), watermark.clone());
        Ok(())
    }

    async fn get_all_watermarks(&self) -> Result<Vec<Watermark>> {
        Ok(self.lock().watermarks.values().cloned().collect())
    }

    async fn load_progress(
        &self,
        job_type: &str,
        integration_id: &IntegrationId,
        entity: EntityKind,
    ) -> Result<Option<ResumeProgress>> {
        Ok(self
            .lock()
            .progress
            .get(&(job_type.to_string(), integration_id.to_string(), entity))
            .cloned())
    }

    async fn save_progress(&self, progress: &ResumeProgress) -> Result<()> {
        self.lock().progress.insert(
            (
                progress.job_type.clone(),
                progress.integration_id.to_string(),
                progress.entity,
            ),
            progress.clone(),
        );
        Ok(())
    }

    async fn clear_progress(
        &self,
        job_type: &str,
        integration_id: &IntegrationId,
        entity: EntityKind,
    ) -> Result<()> {
        self.lock()
            .progress
            .remove(&(job_type.to_string(), integration_id.to_string(), entity));
        Ok(())
    }

    async fn list_progress(&self) -> Result<Vec<ResumeProgress>> {
        Ok(self.lock().progress.values().cloned().collect())
    }

    async fn append_execution_log(&self, entry: &ExecutionLogEntry) -> Result<()> {
        self.lock().executions.push(entry.clone());
        Ok(())
    }

    async fn recent_execution_logs(
        &self,
        integration_id: Option<&IntegrationId>,
        limit: usize,
    ) -> Result<Vec<ExecutionLogEntry>> {
        Ok(self
            .lock()
            .executions
            .iter()
            .rev()
            .filter(|e| integration_id.map_or(true, |id| &e.integration_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}
