//! Fetch strategy selection
//!
//! | watermark | trigger   | named query | strategy                        |
//! |-----------|-----------|-------------|---------------------------------|
//! | none      | any       | any         | full table read                 |
//! | present   | manual    | any         | full table read                 |
//! | present   | scheduled | available   | named query since the watermark |
//! | present   | scheduled | none        | filtered table read             |
//!
//! Resume windows, parent-scoped fetches and destructive full syncs always
//! read the full table, as does any entity kind without timestamps of its
//! own.

use crate::config::IntegrationConfig;
use crate::core::sync::options::SyncTrigger;
use crate::domain::record::ERP_DATETIME_FORMAT;
use chrono::{DateTime, Datelike, Utc};

/// Changed-since value that makes a named query return everything
pub const EPOCH_SENTINEL: &str = "1900-01-01 00:00:00";

/// How rows are read from the ERP for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Every row of the table
    FullTable,
    /// Pre-compiled query with a changed-since parameter
    NamedQuery { query: String, since: String },
    /// Table read filtered on the insert/update timestamps
    IncrementalTable { filter: String },
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::FullTable => "full_table",
            FetchStrategy::NamedQuery { .. } => "named_query",
            FetchStrategy::IncrementalTable { .. } => "incremental_table",
        }
    }

    /// Whether classification compares timestamps against the watermark
    pub fn is_incremental(&self) -> bool {
        !matches!(self, FetchStrategy::FullTable)
    }

    /// Table filter expression; empty for a full read
    pub fn table_filter(&self) -> &str {
        match self {
            FetchStrategy::IncrementalTable { filter } => filter,
            _ => "",
        }
    }
}

/// Picks the fetch strategy for a run
///
/// `force_full` is set for resume windows, parent-scoped fetches and
/// destructive full syncs.
pub fn decide(
    integration: &IntegrationConfig,
    watermark: Option<DateTime<Utc>>,
    trigger: SyncTrigger,
    force_full: bool,
) -> FetchStrategy {
    let Some(since) = watermark else {
        return FetchStrategy::FullTable;
    };
    if force_full || trigger == SyncTrigger::Manual {
        return FetchStrategy::FullTable;
    }
    if !integration.entity.has_reliable_timestamps() {
        return FetchStrategy::FullTable;
    }

    match named_query(integration) {
        Some(query) => FetchStrategy::NamedQuery {
            query: query.to_string(),
            since: format_since(since),
        },
        None => FetchStrategy::IncrementalTable {
            filter: changed_since_filter(integration, since),
        },
    }
}

/// The named query usable for this integration, if any
pub fn named_query(integration: &IntegrationConfig) -> Option<&str> {
    integration
        .named_query
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .filter(|_| integration.entity.supports_named_query())
}

/// Formats a watermark as the ERP's changed-since parameter
///
/// Anything before the ERP's epoch is sent as [`EPOCH_SENTINEL`].
pub fn format_since(since: DateTime<Utc>) -> String {
    if since.year() < 1900 {
        return EPOCH_SENTINEL.to_string();
    }
    since.naive_utc().format(ERP_DATETIME_FORMAT).to_string()
}

/// Filter selecting rows inserted or updated after `since`
pub fn changed_since_filter(integration: &IntegrationConfig, since: DateTime<Utc>) -> String {
    let since = format_since(since);
    format!(
        "{table}.{ins}>'{since}' OR {table}.{upd}>'{since}'",
        table = integration.remote_table,
        ins = integration.inserted_at_field,
        upd = integration.updated_at_field,
    )
}

/// Filter selecting the children of one parent
pub fn parent_filter(integration: &IntegrationConfig, parent_field: &str, parent_id: &str) -> String {
    format!("{}.{}={}", integration.remote_table, parent_field, parent_id)
}
