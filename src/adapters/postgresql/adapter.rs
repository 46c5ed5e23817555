//! PostgreSQL adapter implementing the storage traits
//!
//! All synced entity types share the `synced_records` table, keyed by
//! `(entity_type, pk)`. Batch upserts are a single `INSERT ... SELECT FROM
//! UNNEST(...) ON CONFLICT` statement, so a batch is written entirely or
//! not at all.

use crate::adapters::database::traits::{EntityStore, StateStorage};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    execution_from_row, existing_from_row, progress_from_row, PostgreSQLWatermark,
    RECORD_SUMMARY_COLUMNS,
};
use crate::core::state::{ExecutionLogEntry, ResumeProgress, Watermark};
use crate::domain::{
    EntityKind, ExistingRecord, IntegrationId, LocalRecord, Result, StoreError, SyncError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

const UPSERT_BATCH: &str = r#"
    INSERT INTO synced_records (
        entity_type, pk, unique_value, customer_ref, parent_pk, fields, fingerprint, synced_at
    )
    SELECT *, now() FROM UNNEST(
        $1::text[], $2::bigint[], $3::text[], $4::text[], $5::bigint[], $6::jsonb[], $7::text[]
    )
    ON CONFLICT (entity_type, pk) DO UPDATE SET
        unique_value = EXCLUDED.unique_value,
        customer_ref = EXCLUDED.customer_ref,
        parent_pk = EXCLUDED.parent_pk,
        fields = EXCLUDED.fields,
        fingerprint = EXCLUDED.fingerprint,
        synced_at = EXCLUDED.synced_at
"#;

const UPSERT_ONE: &str = r#"
    INSERT INTO synced_records (
        entity_type, pk, unique_value, customer_ref, parent_pk, fields, fingerprint, synced_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, now())
    ON CONFLICT (entity_type, pk) DO UPDATE SET
        unique_value = EXCLUDED.unique_value,
        customer_ref = EXCLUDED.customer_ref,
        parent_pk = EXCLUDED.parent_pk,
        fields = EXCLUDED.fields,
        fingerprint = EXCLUDED.fingerprint,
        synced_at = EXCLUDED.synced_at
"#;

const INSERT_ONE: &str = r#"
    INSERT INTO synced_records (
        entity_type, pk, unique_value, customer_ref, parent_pk, fields, fingerprint, synced_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, now())
"#;

/// PostgreSQL implementation of [`EntityStore`] and [`StateStorage`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    async fn summaries(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<ExistingRecord>> {
        self.client
            .query(query, params)
            .await?
            .iter()
            .map(existing_from_row)
            .collect()
    }

    async fn write_one(&self, statement: &str, record: &LocalRecord) -> Result<u64> {
        let fields = Value::Object(record.fields.clone());
        self.client
            .execute(
                statement,
                &[
                    &record.kind.as_str(),
                    &record.pk,
                    &record.unique_value,
                    &record.customer_ref,
                    &record.parent_pk,
                    &fields,
                    &record.fingerprint,
                ],
            )
            .await
    }
}

#[async_trait]
impl EntityStore for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn find_by_unique_values(
        &self,
        kind: EntityKind,
        values: &[String],
    ) -> Result<Vec<ExistingRecord>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {RECORD_SUMMARY_COLUMNS} FROM synced_records \
             WHERE entity_type = $1 AND unique_value = ANY($2) ORDER BY pk"
        );
        self.summaries(&query, &[&kind.as_str(), &values]).await
    }

    async fn page_all(
        &self,
        kind: EntityKind,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ExistingRecord>> {
        let query = format!(
            "SELECT {RECORD_SUMMARY_COLUMNS} FROM synced_records \
             WHERE entity_type = $1 ORDER BY pk OFFSET $2 LIMIT $3"
        );
        let offset = offset as i64;
        let limit = limit as i64;
        self.summaries(&query, &[&kind.as_str(), &offset, &limit])
            .await
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        let rows = self
            .client
            .query(
                "SELECT COUNT(*) AS n FROM synced_records WHERE entity_type = $1",
                &[&kind.as_str()],
            )
            .await?;
        let n: i64 = rows
            .first()
            .map(|row| row.try_get("n"))
            .transpose()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .unwrap_or(0);
        Ok(n.max(0) as u64)
    }

    async fn upsert_batch(&self, records: &[LocalRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let kinds: Vec<&str> = records.iter().map(|r| r.kind.as_str()).collect();
        let pks: Vec<i64> = records.iter().map(|r| r.pk).collect();
        let uniques: Vec<&str> = records.iter().map(|r| r.unique_value.as_str()).collect();
        let customers: Vec<Option<&str>> =
            records.iter().map(|r| r.customer_ref.as_deref()).collect();
        let parents: Vec<Option<i64>> = records.iter().map(|r| r.parent_pk).collect();
        let fields: Vec<Value> = records
            .iter()
            .map(|r| Value::Object(r.fields.clone()))
            .collect();
        let fingerprints: Vec<&str> = records.iter().map(|r| r.fingerprint.as_str()).collect();

        self.client
            .execute(
                UPSERT_BATCH,
                &[
                    &kinds,
                    &pks,
                    &uniques,
                    &customers,
                    &parents,
                    &fields,
                    &fingerprints,
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_one(&self, record: &LocalRecord) -> Result<()> {
        self.write_one(UPSERT_ONE, record).await.map(|_| ())
    }

    async fn find_by_unique(
        &self,
        kind: EntityKind,
        unique_value: &str,
    ) -> Result<Option<ExistingRecord>> {
        let query = format!(
            "SELECT {RECORD_SUMMARY_COLUMNS} FROM synced_records \
             WHERE entity_type = $1 AND unique_value = $2 ORDER BY pk LIMIT 1"
        );
        Ok(self
            .summaries(&query, &[&kind.as_str(), &unique_value])
            .await?
            .into_iter()
            .next())
    }

    async fn insert(&self, record: &LocalRecord) -> Result<()> {
        self.write_one(INSERT_ONE, record).await.map(|_| ())
    }

    async fn update_by_pk(&self, pk: i64, record: &LocalRecord) -> Result<()> {
        let fields = Value::Object(record.fields.clone());
        let updated = self
            .client
            .execute(
                "UPDATE synced_records SET unique_value = $3, customer_ref = $4, parent_pk = $5, \
                 fields = $6, fingerprint = $7, synced_at = now() \
                 WHERE entity_type = $1 AND pk = $2",
                &[
                    &record.kind.as_str(),
                    &pk,
                    &record.unique_value,
                    &record.customer_ref,
                    &record.parent_pk,
                    &fields,
                    &record.fingerprint,
                ],
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::WriteFailed(format!(
                "No {} record with pk {pk}",
                record.kind
            ))
            .into());
        }
        Ok(())
    }

    async fn delete_all(&self, kind: EntityKind) -> Result<u64> {
        self.client
            .execute(
                "DELETE FROM synced_records WHERE entity_type = $1",
                &[&kind.as_str()],
            )
            .await
    }

    async fn synced_since(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExistingRecord>> {
        let query = format!(
            "SELECT {RECORD_SUMMARY_COLUMNS} FROM synced_records \
             WHERE entity_type = $1 AND synced_at >= $2 ORDER BY pk"
        );
        self.summaries(&query, &[&kind.as_str(), &since]).await
    }
}

#[async_trait]
impl StateStorage for PostgreSQLAdapter {
    async fn load_watermark(&self, integration_id: &IntegrationId) -> Result<Option<Watermark>> {
        tracing::debug!(integration_id = %integration_id, "Loading watermark from PostgreSQL");

        let rows = self
            .client
            .query(
                "SELECT * FROM sync_watermarks WHERE integration_id = $1",
                &[&integration_id.as_str()],
            )
            .await?;

        match rows.first() {
            Some(row) => Ok(Some(PostgreSQLWatermark::from_row(row)?.to_domain()?)),
            None => {
                tracing::debug!(integration_id = %integration_id, "No watermark found (first sync)");
                Ok(None)
            }
        }
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<()> {
        let row = PostgreSQLWatermark::from_domain(watermark);

        self.client
            .execute(
                r#"
                INSERT INTO sync_watermarks (
                    integration_id, entity_type, synced_through, last_run_started_at,
                    last_run_completed_at, last_run_status, records_synced
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (integration_id) DO UPDATE SET
                    entity_type = EXCLUDED.entity_type,
                    synced_through = EXCLUDED.synced_through,
                    last_run_started_at = EXCLUDED.last_run_started_at,
                    last_run_completed_at = EXCLUDED.last_run_completed_at,
                    last_run_status = EXCLUDED.last_run_status,
                    records_synced = EXCLUDED.records_synced
                "#,
                &[
                    &row.integration_id,
                    &row.entity_type,
                    &row.synced_through,
                    &row.last_run_started_at,
                    &row.last_run_completed_at,
                    &row.last_run_status,
                    &row.records_synced,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_all_watermarks(&self) -> Result<Vec<Watermark>> {
        self.client
            .query("SELECT * FROM sync_watermarks ORDER BY integration_id", &[])
            .await?
            .iter()
            .map(|row| PostgreSQLWatermark::from_row(row)?.to_domain())
            .collect()
    }

    async fn load_progress(
        &self,
        job_type: &str,
        integration_id: &IntegrationId,
        entity: EntityKind,
    ) -> Result<Option<ResumeProgress>> {
        let rows = self
            .client
            .query(
                "SELECT * FROM sync_progress \
                 WHERE job_type = $1 AND integration_id = $2 AND entity_type = $3",
                &[&job_type, &integration_id.as_str(), &entity.as_str()],
            )
            .await?;
        rows.first().map(progress_from_row).transpose()
    }

    async fn save_progress(&self, progress: &ResumeProgress) -> Result<()> {
        let offset = progress.offset as i64;
        let total = progress.total as i64;

        self.client
            .execute(
                r#"
                INSERT INTO sync_progress (
                    job_type, integration_id, entity_type, offset_value, total, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (job_type, integration_id, entity_type) DO UPDATE SET
                    offset_value = EXCLUDED.offset_value,
                    total = EXCLUDED.total,
                    updated_at = EXCLUDED.updated_at
                "#,
                &[
                    &progress.job_type,
                    &progress.integration_id.as_str(),
                    &progress.entity.as_str(),
                    &offset,
                    &total,
                    &progress.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn clear_progress(
        &self,
        job_type: &str,
        integration_id: &IntegrationId,
        entity: EntityKind,
    ) -> Result<()> {
        self.client
            .execute(
                "DELETE FROM sync_progress \
                 WHERE job_type = $1 AND integration_id = $2 AND entity_type = $3",
                &[&job_type, &integration_id.as_str(), &entity.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn list_progress(&self) -> Result<Vec<ResumeProgress>> {
        self.client
            .query(
                "SELECT * FROM sync_progress ORDER BY integration_id, entity_type",
                &[],
            )
            .await?
            .iter()
            .map(progress_from_row)
            .collect()
    }

    async fn append_execution_log(&self, entry: &ExecutionLogEntry) -> Result<()> {
        let stats = serde_json::to_value(&entry.stats)?;
        let duration_ms = entry.duration_ms as i64;

        self.client
            .execute(
                r#"
                INSERT INTO sync_execution_logs (
                    id, integration_id, entity_type, started_at, finished_at, duration_ms,
                    status, trigger, stats, error, details
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
                &[
                    &entry.id,
                    &entry.integration_id.as_str(),
                    &entry.entity.as_str(),
                    &entry.started_at,
                    &entry.finished_at,
                    &duration_ms,
                    &entry.status.as_str(),
                    &entry.trigger.as_str(),
                    &stats,
                    &entry.error,
                    &entry.details,
                ],
            )
            .await
            .map_err(|e| SyncError::State(format!("Failed to append execution log: {e}")))?;
        Ok(())
    }

    async fn recent_execution_logs(
        &self,
        integration_id: Option<&IntegrationId>,
        limit: usize,
    ) -> Result<Vec<ExecutionLogEntry>> {
        let limit = limit as i64;
        let rows = match integration_id {
            Some(id) => {
                self.client
                    .query(
                        "SELECT * FROM sync_execution_logs WHERE integration_id = $1 \
                         ORDER BY started_at DESC LIMIT $2",
                        &[&id.as_str(), &limit],
                    )
                    .await?
            }
            None => {
                self.client
                    .query(
                        "SELECT * FROM sync_execution_logs ORDER BY started_at DESC LIMIT $1",
                        &[&limit],
                    )
                    .await?
            }
        };
        rows.iter().map(execution_from_row).collect()
    }
}
