//! Batched persistence with per-record fallback
//!
//! Native-upsert kinds write fixed-size batches; when a batch fails its
//! members are retried one by one so a single malformed record does not
//! take its batch-mates down with it. Find-then-write kinds are always
//! written per record. Per-record writes run with bounded fan-out and
//! retry lock timeouts and connectivity errors with backoff.

use crate::adapters::database::traits::EntityStore;
use crate::core::retry::{retry_with_backoff, RetryPolicy};
use crate::core::sync::classify::{PendingWrite, WriteAction};
use crate::domain::{EntityKind, LocalRecord, RecordFailure, Result, SyncError, WriteStrategy};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Outcome of persisting a set of records
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub created: u64,
    pub updated: u64,
    pub failures: Vec<RecordFailure>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, action: WriteAction) {
        match action {
            WriteAction::Create => self.created += 1,
            WriteAction::Update => self.updated += 1,
        }
    }

    pub fn add_failure(&mut self, failure: RecordFailure) {
        self.failures.push(failure);
    }

    pub fn errored(&self) -> u64 {
        self.failures.len() as u64
    }

    pub fn merge(&mut self, other: BatchResult) {
        self.created += other.created;
        self.updated += other.updated;
        self.failures.extend(other.failures);
    }
}

/// Writes classified records to the entity store
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn EntityStore>,
    kind: EntityKind,
    retry: RetryPolicy,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn EntityStore>, kind: EntityKind, retry: RetryPolicy) -> Self {
        Self { store, kind, retry }
    }

    /// Persists every pending write; never fails as a whole
    pub async fn persist(&self, writes: &[PendingWrite]) -> BatchResult {
        let mut result = BatchResult::new();

        match self.kind.write_strategy() {
            WriteStrategy::NativeUpsert => {
                for chunk in writes.chunks(self.kind.batch_size()) {
                    result.merge(self.persist_chunk(chunk).await);
                }
            }
            WriteStrategy::FindThenWrite => {
                result.merge(self.write_individually(writes).await);
            }
        }

        result
    }

    async fn persist_chunk(&self, chunk: &[PendingWrite]) -> BatchResult {
        let records: Vec<LocalRecord> = chunk.iter().map(|w| w.record.clone()).collect();

        match self.store.upsert_batch(&records).await {
            Ok(()) => {
                let mut result = BatchResult::new();
                for write in chunk {
                    result.add_success(write.action);
                }
                tracing::debug!(
                    entity = %self.kind,
                    batch_size = chunk.len(),
                    "Batch persisted"
                );
                result
            }
            Err(e) => {
                tracing::warn!(
                    entity = %self.kind,
                    batch_size = chunk.len(),
                    error = %e,
                    "Batch write failed, retrying records individually"
                );
                self.write_individually(chunk).await
            }
        }
    }

    async fn write_individually(&self, writes: &[PendingWrite]) -> BatchResult {
        let outcomes: Vec<(usize, Result<WriteAction>)> =
            stream::iter(writes.iter().cloned().enumerate())
                .map(|(i, write)| {
                    let writer = self.clone();
                    async move { (i, writer.write_one(write).await) }
                })
                .buffer_unordered(self.kind.write_fan_out().max(1))
                .collect()
                .await;

        let mut result = BatchResult::new();
        for (i, outcome) in outcomes {
            match outcome {
                Ok(action) => result.add_success(action),
                Err(e) => {
                    let unique_id = &writes[i].record.unique_value;
                    tracing::warn!(
                        entity = %self.kind,
                        unique_id = %unique_id,
                        error = %e,
                        "Record write failed"
                    );
                    result.add_failure(RecordFailure::new(unique_id.clone(), e.to_string()));
                }
            }
        }
        result
    }

    async fn write_one(self, write: PendingWrite) -> Result<WriteAction> {
        let retry = self.retry;
        let writer = Arc::new(self);
        let write = Arc::new(write);
        retry_with_backoff(&retry, SyncError::is_transient, move || {
            let writer = Arc::clone(&writer);
            let write = Arc::clone(&write);
            async move { writer.attempt(&write).await }
        })
        .await
    }

    async fn attempt(&self, write: &PendingWrite) -> Result<WriteAction> {
        match self.kind.write_strategy() {
            WriteStrategy::NativeUpsert => {
                self.store.upsert_one(&write.record).await?;
                Ok(write.action)
            }
            WriteStrategy::FindThenWrite => self.find_then_write(&write.record).await,
        }
    }

    async fn find_then_write(&self, record: &LocalRecord) -> Result<WriteAction> {
        if let Some(existing) = self.store.find_by_unique(self.kind, &record.unique_value).await? {
            self.store.update_by_pk(existing.pk, record).await?;
            return Ok(WriteAction::Update);
        }

        match self.store.insert(record).await {
            Ok(()) => Ok(WriteAction::Create),
            Err(e) if e.is_duplicate_key() => {
                // Another writer in this run got there first
                self.store.update_by_pk(record.pk, record).await?;
                Ok(WriteAction::Update)
            }
            Err(e) => Err(e),
        }
    }
}
