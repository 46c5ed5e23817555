//! State manager for watermarks, resume progress and the execution log

use crate::adapters::database::traits::StateStorage;
use crate::core::state::execution::ExecutionLogEntry;
use crate::core::state::progress::{ResumeProgress, SYNC_JOB_TYPE};
use crate::core::state::watermark::Watermark;
use crate::domain::{EntityKind, IntegrationId, Result};
use std::sync::Arc;

/// State manager
///
/// Thin layer over a [`StateStorage`] backend that fixes the sync job type
/// and logs state transitions.
#[derive(Clone)]
pub struct StateManager {
    storage: Arc<dyn StateStorage + Send + Sync>,
}

impl StateManager {
    pub fn new_with_storage(storage: Arc<dyn StateStorage + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Load the watermark of an integration; `None` means first sync
    pub async fn load_watermark(&self, integration_id: &IntegrationId) -> Result<Option<Watermark>> {
        self.storage.load_watermark(integration_id).await
    }

    pub async fn save_watermark(&self, watermark: &Watermark) -> Result<()> {
        tracing::info!(
            integration_id = %watermark.integration_id,
            synced_through = %watermark.synced_through,
            status = %watermark.last_run_status,
            "Advancing watermark"
        );
        self.storage.save_watermark(watermark).await
    }

    pub async fn get_all_watermarks(&self) -> Result<Vec<Watermark>> {
        self.storage.get_all_watermarks().await
    }

    /// Load resume progress for a resumable entity type
    pub async fn load_progress(
        &self,
        integration_id: &IntegrationId,
        entity: EntityKind,
    ) -> Result<Option<ResumeProgress>> {
        self.storage
            .load_progress(SYNC_JOB_TYPE, integration_id, entity)
            .await
    }

    pub async fn save_progress(&self, progress: &ResumeProgress) -> Result<()> {
        tracing::info!(
            integration_id = %progress.integration_id,
            entity = %progress.entity,
            offset = progress.offset,
            total = progress.total,
            "Checkpointing resume progress"
        );
        self.storage.save_progress(progress).await
    }

    pub async fn clear_progress(&self, integration_id: &IntegrationId, entity: EntityKind) -> Result<()> {
        tracing::info!(
            integration_id = %integration_id,
            entity = %entity,
            "Dataset fully consumed, clearing resume progress"
        );
        self.storage
            .clear_progress(SYNC_JOB_TYPE, integration_id, entity)
            .await
    }

    pub async fn list_progress(&self) -> Result<Vec<ResumeProgress>> {
        self.storage.list_progress().await
    }

    pub async fn record_execution(&self, entry: &ExecutionLogEntry) -> Result<()> {
        self.storage.append_execution_log(entry).await
    }

    /// Latest execution log entries, newest first
    pub async fn recent_executions(
        &self,
        integration_id: Option<&IntegrationId>,
        limit: usize,
    ) -> Result<Vec<ExecutionLogEntry>> {
        self.storage
            .recent_execution_logs(integration_id, limit)
            .await
    }
}
