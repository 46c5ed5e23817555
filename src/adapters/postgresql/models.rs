//! Row mappings for the ParkSync tables
//!
//! Each struct mirrors one table row; conversions to and from the domain
//! types validate the text columns that carry enums and identifiers.

use crate::core::state::{ExecutionLogEntry, ResumeProgress, RunStatus, Watermark};
use crate::core::sync::options::SyncTrigger;
use crate::core::sync::summary::SyncStats;
use crate::domain::{EntityKind, ExistingRecord, IntegrationId, Result, StoreError, SyncError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;
use uuid::Uuid;

fn column<'a, T>(row: &'a Row, name: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name).map_err(|e| {
        SyncError::Store(StoreError::QueryFailed(format!(
            "Failed to read column '{name}': {e}"
        )))
    })
}

fn parse_entity(raw: &str) -> Result<EntityKind> {
    raw.parse().map_err(SyncError::State)
}

fn parse_integration(raw: String) -> Result<IntegrationId> {
    IntegrationId::try_from(raw).map_err(|e| SyncError::State(e.to_string()))
}

fn parse_status(raw: &str) -> Result<RunStatus> {
    RunStatus::parse(raw).ok_or_else(|| SyncError::State(format!("Unknown run status '{raw}'")))
}

/// Summary columns of `synced_records`
pub const RECORD_SUMMARY_COLUMNS: &str = "pk, unique_value, customer_ref, fingerprint, synced_at";

pub fn existing_from_row(row: &Row) -> Result<ExistingRecord> {
    Ok(ExistingRecord {
        pk: column(row, "pk")?,
        unique_value: column(row, "unique_value")?,
        customer_ref: column(row, "customer_ref")?,
        fingerprint: column(row, "fingerprint")?,
        synced_at: column(row, "synced_at")?,
    })
}

/// Row of `sync_watermarks`
#[derive(Debug, Clone)]
pub struct PostgreSQLWatermark {
    pub integration_id: String,
    pub entity_type: String,
    pub synced_through: DateTime<Utc>,
    pub last_run_started_at: DateTime<Utc>,
    pub last_run_completed_at: DateTime<Utc>,
    pub last_run_status: String,
    pub records_synced: i64,
}

impl PostgreSQLWatermark {
    pub fn from_domain(watermark: &Watermark) -> Self {
        Self {
            integration_id: watermark.integration_id.to_string(),
            entity_type: watermark.entity.as_str().to_string(),
            synced_through: watermark.synced_through,
            last_run_started_at: watermark.last_run_started_at,
            last_run_completed_at: watermark.last_run_completed_at,
            last_run_status: watermark.last_run_status.as_str().to_string(),
            records_synced: watermark.records_synced as i64,
        }
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            integration_id: column(row, "integration_id")?,
            entity_type: column(row, "entity_type")?,
            synced_through: column(row, "synced_through")?,
            last_run_started_at: column(row, "last_run_started_at")?,
            last_run_completed_at: column(row, "last_run_completed_at")?,
            last_run_status: column(row, "last_run_status")?,
            records_synced: column(row, "records_synced")?,
        })
    }

    pub fn to_domain(self) -> Result<Watermark> {
        Ok(Watermark {
            integration_id: parse_integration(self.integration_id)?,
            entity: parse_entity(&self.entity_type)?,
            synced_through: self.synced_through,
            last_run_started_at: self.last_run_started_at,
            last_run_completed_at: self.last_run_completed_at,
            last_run_status: parse_status(&self.last_run_status)?,
            records_synced: self.records_synced.max(0) as u64,
        })
    }
}

pub fn progress_from_row(row: &Row) -> Result<ResumeProgress> {
    let entity: String = column(row, "entity_type")?;
    let offset: i64 = column(row, "offset_value")?;
    let total: i64 = column(row, "total")?;

    Ok(ResumeProgress {
        job_type: column(row, "job_type")?,
        integration_id: parse_integration(column(row, "integration_id")?)?,
        entity: parse_entity(&entity)?,
        offset: offset.max(0) as usize,
        total: total.max(0) as usize,
        updated_at: column(row, "updated_at")?,
    })
}

pub fn execution_from_row(row: &Row) -> Result<ExecutionLogEntry> {
    let entity: String = column(row, "entity_type")?;
    let status: String = column(row, "status")?;
    let trigger: String = column(row, "trigger")?;
    let stats: Value = column(row, "stats")?;
    let duration_ms: i64 = column(row, "duration_ms")?;
    let id: Uuid = column(row, "id")?;

    let trigger: SyncTrigger = serde_json::from_value(Value::String(trigger))?;
    let stats: SyncStats = serde_json::from_value(stats)?;

    Ok(ExecutionLogEntry {
        id,
        integration_id: parse_integration(column(row, "integration_id")?)?,
        entity: parse_entity(&entity)?,
        started_at: column(row, "started_at")?,
        finished_at: column(row, "finished_at")?,
        duration_ms: duration_ms.max(0) as u64,
        status: parse_status(&status)?,
        trigger,
        stats,
        error: column(row, "error")?,
        details: column(row, "details")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::WatermarkBuilder;

    #[test]
    fn test_watermark_round_trip() {
        let watermark = WatermarkBuilder::new("contracts".parse().unwrap(), EntityKind::Contract)
            .last_run_status(RunStatus::Partial)
            .records_synced(42)
            .build();

        let row = PostgreSQLWatermark::from_domain(&watermark);
        assert_eq!(row.entity_type, "contract");
        assert_eq!(row.last_run_status, "partial");

        let back = row.to_domain().unwrap();
        assert_eq!(back, watermark);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let watermark = WatermarkBuilder::new("items".parse().unwrap(), EntityKind::Item).build();
        let mut row = PostgreSQLWatermark::from_domain(&watermark);
        row.last_run_status = "running".into();
        assert!(row.to_domain().is_err());
    }
}
