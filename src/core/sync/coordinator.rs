//! Sync orchestration
//!
//! One `run_sync` call drives a single integration through
//! authenticate, strategy selection, fetch, normalization, index build,
//! classification and gating, batched persistence, watermark and progress
//! bookkeeping, and the execution log. All per-run state lives in a
//! [`RunContext`] threaded through the steps.

use crate::adapters::database::traits::EntityStore;
use crate::adapters::softone::{RawPage, RemoteSource, TableRequest};
use crate::config::{IntegrationConfig, ParkSyncConfig};
use crate::core::normalize::normalize;
use crate::core::resolve::{build_index, ResolutionIndex};
use crate::core::retry::{retry_with_backoff, RetryPolicy};
use crate::core::state::{
    ExecutionLogEntry, ResumeProgress, RunStatus, StateManager, WatermarkBuilder,
};
use crate::core::sync::batch::BatchWriter;
use crate::core::sync::classify::{
    unique_key, Classification, ClassifyContext, PendingWrite, WriteAction,
};
use crate::core::sync::options::SyncOptions;
use crate::core::sync::strategy::{self, FetchStrategy};
use crate::core::sync::summary::{ProgressInfo, SyncOutcome, SyncStats};
use crate::domain::{
    EntityKind, IntegrationId, NormalizedKey, ParentGate, RecordFailure, RemoteRecord, Result,
    SessionToken, SyncError,
};
use crate::{log_sync_complete, log_sync_start};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Days per month in recent-parent mode
const DAYS_PER_MONTH: i64 = 30;

/// Failures copied into an execution log entry
const LOGGED_FAILURES: usize = 20;

/// Mutable state of one run
struct RunContext {
    integration: Arc<IntegrationConfig>,
    options: SyncOptions,
    started_at: DateTime<Utc>,
    strategy: Option<&'static str>,
    fell_back: bool,
    fetched: usize,
    failed_parents: Vec<String>,
    stats: SyncStats,
    failures: Vec<RecordFailure>,
    progress: Option<ProgressInfo>,
}

impl RunContext {
    fn new(integration: Arc<IntegrationConfig>, options: SyncOptions) -> Self {
        Self {
            integration,
            options,
            started_at: Utc::now(),
            strategy: None,
            fell_back: false,
            fetched: 0,
            failed_parents: Vec::new(),
            stats: SyncStats::default(),
            failures: Vec::new(),
            progress: None,
        }
    }

    fn kind(&self) -> EntityKind {
        self.integration.entity
    }

    fn details(&self) -> Value {
        let errors: Vec<Value> = self
            .failures
            .iter()
            .take(LOGGED_FAILURES)
            .map(|f| json!({"unique_id": f.unique_id, "error": f.error}))
            .collect();

        json!({
            "model": self.integration.remote_object,
            "table": self.integration.remote_table,
            "direction": self.integration.direction.as_str(),
            "trigger": self.options.trigger.as_str(),
            "strategy": self.strategy,
            "named_query_fallback": self.fell_back,
            "fetched": self.fetched,
            "full_sync": self.options.full_sync,
            "parent_ids": self.options.parent_ids,
            "recent_parent_months": self.options.recent_parent_months,
            "failed_parents": self.failed_parents,
            "skip_reasons": self.stats.skip_reasons,
            "progress": self.progress,
            "errors": errors,
        })
    }
}

/// Sync coordinator
///
/// Holds one [`RemoteSource`] per configured connection name.
pub struct SyncCoordinator {
    config: Arc<ParkSyncConfig>,
    sources: HashMap<String, Arc<dyn RemoteSource>>,
    store: Arc<dyn EntityStore>,
    state: StateManager,
    retry: RetryPolicy,
}

impl SyncCoordinator {
    pub fn new(
        config: Arc<ParkSyncConfig>,
        store: Arc<dyn EntityStore>,
        state: StateManager,
    ) -> Self {
        let retry = RetryPolicy::from(&config.sync.retry);
        Self {
            config,
            sources: HashMap::new(),
            store,
            state,
            retry,
        }
    }

    /// Registers the remote source for a connection name
    pub fn with_source(mut self, connection: impl Into<String>, source: Arc<dyn RemoteSource>) -> Self {
        self.sources.insert(connection.into(), source);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Runs one sync of an integration
    ///
    /// Returns the outcome of any run that reached persistence, including
    /// runs where every write failed. Runs aborted by authentication, fetch,
    /// configuration or timeout errors return the error after a failed
    /// execution log entry has been written.
    pub async fn run_sync(
        &self,
        integration_id: &IntegrationId,
        options: SyncOptions,
    ) -> Result<SyncOutcome> {
        let integration = self.config.integration(integration_id).ok_or_else(|| {
            SyncError::Configuration(format!("Unknown integration '{integration_id}'"))
        })?;
        let source = self
            .sources
            .get(&integration.connection)
            .cloned()
            .ok_or_else(|| {
                SyncError::Configuration(format!(
                    "No remote source registered for connection '{}'",
                    integration.connection
                ))
            })?;

        if !integration.enabled {
            tracing::warn!(integration_id = %integration_id, "Running a disabled integration");
        }

        let clock = Instant::now();
        let mut run = RunContext::new(Arc::new(integration.clone()), options.clone());
        log_sync_start!(integration_id, run.kind(), options.trigger);

        let limit = self.config.sync.run_timeout();
        let result = match tokio::time::timeout(limit, self.execute(source, &mut run)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(limit.as_secs())),
        };

        let duration = clock.elapsed();

        match result {
            Ok(()) => {
                let status = RunStatus::from_stats(&run.stats);
                let error = (status == RunStatus::Failed)
                    .then(|| format!("All {} writes failed", run.stats.errored));

                if !options.dry_run {
                    if let Err(e) = self.finish_state(&run, status, options.full_sync).await {
                        tracing::error!(
                            integration_id = %integration_id,
                            error = %e,
                            "Saving sync state failed"
                        );
                        let message = format!("Saving sync state failed: {e}");
                        self.record_execution(&run, RunStatus::Failed, Some(message))
                            .await;
                        return Err(e);
                    }
                    self.record_execution(&run, status, error.clone()).await;
                }

                log_sync_complete!(
                    integration_id,
                    run.stats.created,
                    run.stats.updated,
                    run.stats.errored,
                    run.stats.skipped,
                    duration
                );

                let outcome = SyncOutcome {
                    success: status != RunStatus::Failed,
                    status,
                    stats: run.stats.clone(),
                    progress: run.progress,
                    failures: run.failures.clone(),
                    error,
                    duration,
                    dry_run: options.dry_run,
                };
                outcome.log_summary();
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(
                    integration_id = %integration_id,
                    entity = %run.kind(),
                    error = %e,
                    "Sync aborted"
                );
                if !options.dry_run {
                    self.record_execution(&run, RunStatus::Failed, Some(e.to_string()))
                        .await;
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, source: Arc<dyn RemoteSource>, run: &mut RunContext) -> Result<()> {
        let shared = Arc::clone(&run.integration);
        let integration = shared.as_ref();
        let options = run.options.clone();
        let kind = run.kind();

        // AUTHENTICATE
        let authenticator = Arc::clone(&source);
        let token = retry_with_backoff(&self.retry, SyncError::is_transient, move || {
            let source = Arc::clone(&authenticator);
            async move { source.authenticate().await }
        })
        .await?;

        // DECIDE_STRATEGY
        let watermark = self.state.load_watermark(&integration.id).await?;
        let since = watermark.as_ref().map(|w| w.synced_through);

        let parent_mode = kind.parent_gate() != ParentGate::None && options.uses_parent_scope();
        if options.uses_parent_scope() && !parent_mode {
            tracing::warn!(entity = %kind, "Parent scoping ignored for an entity without parents");
        }

        let stored_progress = if kind.is_resumable() && !parent_mode && !options.full_sync {
            self.state.load_progress(&integration.id, kind).await?
        } else {
            None
        };
        let resuming = stored_progress.is_some() || options.resume_offset.is_some();

        let strategy = strategy::decide(
            integration,
            since,
            options.trigger,
            parent_mode || options.full_sync || resuming,
        );
        run.strategy = Some(if parent_mode { "parent_scoped" } else { strategy.as_str() });

        tracing::info!(
            integration_id = %integration.id,
            strategy = run.strategy.unwrap_or_default(),
            watermark = ?since,
            "Fetch strategy selected"
        );

        // FETCH
        let page = if parent_mode {
            self.fetch_by_parent(&source, &token, run).await?
        } else {
            self.fetch(&source, &token, &strategy, since, run).await?
        };
        run.fetched = page.len();

        // NORMALIZE
        let mut records = normalize(page, &integration.fields);

        if options.full_sync && records.len() > self.config.sync.full_sync_row_limit {
            return Err(SyncError::Validation(format!(
                "Full sync refused: {} rows exceed the limit of {}",
                records.len(),
                self.config.sync.full_sync_row_limit
            )));
        }

        let windowed = kind.is_resumable()
            && !parent_mode
            && !options.full_sync
            && strategy == FetchStrategy::FullTable;
        if windowed {
            let offset = options
                .resume_offset
                .or(stored_progress.as_ref().map(|p| p.offset))
                .unwrap_or(0);
            let page_size = options
                .page_size
                .unwrap_or(self.config.sync.resume_page_size)
                .max(1);
            records = self.resume_window(records, run, offset, page_size);
        }

        run.stats.total = records.len() as u64;

        // BUILD_INDEX
        let keys: Vec<NormalizedKey> = records
            .iter()
            .filter_map(|r| unique_key(integration, r))
            .collect();

        let index = if options.full_sync {
            if !options.dry_run {
                let removed = self.store.delete_all(kind).await?;
                tracing::warn!(entity = %kind, removed = removed, "Full sync removed local records");
            }
            ResolutionIndex::new()
        } else {
            build_index(self.store.as_ref(), kind, &keys).await?
        };

        let parents = match kind.parent_gate() {
            ParentGate::None => None,
            ParentGate::ContractWithCustomer => {
                Some(build_index(self.store.as_ref(), EntityKind::Contract, &[]).await?)
            }
        };

        // CLASSIFY_AND_GATE
        let context = ClassifyContext {
            integration,
            incremental_since: if strategy.is_incremental() { since } else { None },
            index: &index,
            parents: parents.as_ref(),
        };
        let mut pending: Vec<PendingWrite> = Vec::new();
        for record in &records {
            match context.classify(record) {
                Classification::Write(write) => pending.push(write),
                Classification::Skip(reason) => run.stats.skip(reason),
            }
        }

        tracing::info!(
            integration_id = %integration.id,
            queued = pending.len(),
            skipped = run.stats.skipped,
            "Records classified"
        );

        // BATCH_PERSIST
        if options.dry_run {
            for write in &pending {
                match write.action {
                    WriteAction::Create => run.stats.created += 1,
                    WriteAction::Update => run.stats.updated += 1,
                }
            }
        } else {
            let writer = BatchWriter::new(Arc::clone(&self.store), kind, self.retry);
            let result = writer.persist(&pending).await;
            run.stats.created += result.created;
            run.stats.updated += result.updated;
            run.stats.errored += result.errored();
            run.failures.extend(result.failures);
        }

        Ok(())
    }

    /// Reads rows following `strategy`, falling back once from a named query
    async fn fetch(
        &self,
        source: &Arc<dyn RemoteSource>,
        token: &SessionToken,
        strategy: &FetchStrategy,
        since: Option<DateTime<Utc>>,
        run: &mut RunContext,
    ) -> Result<RawPage> {
        let shared = Arc::clone(&run.integration);
        let integration = shared.as_ref();

        if let FetchStrategy::NamedQuery { query, since: param } = strategy {
            let call = (Arc::clone(source), query.clone(), param.clone(), token.clone());
            let named = retry_with_backoff(&self.retry, SyncError::is_transient, move || {
                let (source, query, param, token) = call.clone();
                async move { source.fetch_named_query(&query, &param, &token).await }
            })
            .await;

            return match named {
                Ok(page) => Ok(page),
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        integration_id = %integration.id,
                        query = %query,
                        error = %e,
                        "Named query failed, falling back to table read"
                    );
                    run.fell_back = true;
                    let filter = since
                        .map(|s| strategy::changed_since_filter(integration, s))
                        .unwrap_or_default();
                    self.fetch_table(source, token, integration, &filter).await
                }
                Err(e) => Err(e),
            };
        }

        self.fetch_table(source, token, integration, strategy.table_filter())
            .await
    }

    async fn fetch_table(
        &self,
        source: &Arc<dyn RemoteSource>,
        token: &SessionToken,
        integration: &IntegrationConfig,
        filter: &str,
    ) -> Result<RawPage> {
        let request = TableRequest::new(
            integration.remote_table.clone(),
            integration.fields.clone(),
            filter,
        );
        let call = (Arc::clone(source), request, token.clone());
        retry_with_backoff(&self.retry, SyncError::is_transient, move || {
            let (source, request, token) = call.clone();
            async move { source.fetch_table(&request, &token).await }
        })
        .await
    }

    /// Fetches children one parent at a time
    async fn fetch_by_parent(
        &self,
        source: &Arc<dyn RemoteSource>,
        token: &SessionToken,
        run: &mut RunContext,
    ) -> Result<RawPage> {
        let shared = Arc::clone(&run.integration);
        let integration = shared.as_ref();
        let parent_field = integration.parent_remote_field.as_deref().ok_or_else(|| {
            SyncError::Configuration(format!(
                "Integration '{}' has no parent_remote_field",
                integration.id
            ))
        })?;

        let parent_ids = self.parent_ids(&run.options).await?;
        tracing::info!(
            integration_id = %integration.id,
            parents = parent_ids.len(),
            "Fetching children per parent"
        );

        let mut page = RawPage::default();
        let mut last_error = None;

        for parent_id in &parent_ids {
            let filter = strategy::parent_filter(integration, parent_field, parent_id);
            match self.fetch_table(source, token, integration, &filter).await {
                Ok(children) => page.extend(children),
                Err(e) => {
                    tracing::warn!(
                        integration_id = %integration.id,
                        parent_id = %parent_id,
                        error = %e,
                        "Fetching children of parent failed"
                    );
                    run.failed_parents.push(parent_id.clone());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if run.failed_parents.len() == parent_ids.len() => Err(e),
            _ => Ok(page),
        }
    }

    async fn parent_ids(&self, options: &SyncOptions) -> Result<Vec<String>> {
        let mut ids: BTreeSet<String> = options
            .parent_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if let Some(months) = options.recent_parent_months {
            let since = Utc::now() - ChronoDuration::days(i64::from(months) * DAYS_PER_MONTH);
            for contract in self.store.synced_since(EntityKind::Contract, since).await? {
                ids.insert(contract.unique_value);
            }
        }

        Ok(ids.into_iter().collect())
    }

    /// Orders records by normalized key and keeps `[offset, offset + page_size)`
    fn resume_window(
        &self,
        mut records: Vec<RemoteRecord>,
        run: &mut RunContext,
        offset: usize,
        page_size: usize,
    ) -> Vec<RemoteRecord> {
        records.sort_by_cached_key(|r| unique_key(&run.integration, r));

        let window = ProgressInfo::window(records.len(), offset, page_size);
        run.progress = Some(window);

        tracing::info!(
            integration_id = %run.integration.id,
            total = window.total,
            from = window.completed_from,
            to = window.completed_to,
            "Processing resume window"
        );

        records
            .into_iter()
            .skip(window.completed_from)
            .take(window.completed_to - window.completed_from)
            .collect()
    }

    /// Advances the watermark and resume progress of a run that was not a failure
    ///
    /// A full sync rebuilt the whole table, so any pending resume window is
    /// dropped with it.
    async fn finish_state(
        &self,
        run: &RunContext,
        status: RunStatus,
        full_sync: bool,
    ) -> Result<()> {
        if status == RunStatus::Failed {
            tracing::warn!(
                integration_id = %run.integration.id,
                "Run failed, watermark and progress left untouched"
            );
            return Ok(());
        }

        let integration_id = &run.integration.id;
        let completed_at = Utc::now();
        let mut watermark = match self.state.load_watermark(integration_id).await? {
            Some(existing) => existing,
            None => WatermarkBuilder::new(integration_id.clone(), run.kind())
                .synced_through(run.started_at)
                .last_run_started_at(run.started_at)
                .build(),
        };
        watermark.advance(run.started_at, completed_at, status, run.stats.written());
        self.state.save_watermark(&watermark).await?;

        if let Some(progress) = &run.progress {
            if progress.has_more {
                let record = ResumeProgress::new(
                    integration_id.clone(),
                    run.kind(),
                    progress.next_offset,
                    progress.total,
                );
                self.state.save_progress(&record).await?;
            } else {
                self.state.clear_progress(integration_id, run.kind()).await?;
            }
        } else if full_sync && run.kind().is_resumable() {
            self.state.clear_progress(integration_id, run.kind()).await?;
        }

        Ok(())
    }

    /// Appends the execution log entry; a failure to log is itself only logged
    async fn record_execution(&self, run: &RunContext, status: RunStatus, error: Option<String>) {
        let entry = ExecutionLogEntry::new(
            run.integration.id.clone(),
            run.kind(),
            run.started_at,
            status,
            run.options.trigger,
            run.stats.clone(),
            error,
            run.details(),
        );

        if let Err(e) = self.state.record_execution(&entry).await {
            tracing::error!(
                integration_id = %run.integration.id,
                error = %e,
                "Failed to write execution log entry"
            );
        }
    }
}
