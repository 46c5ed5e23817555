//! Remote source trait
//!
//! Abstracts the three ERP calls the sync engine needs so the orchestrator can
//! be driven by the HTTP client in production and by fixtures in tests.

use super::models::RawPage;
use crate::domain::{Result, SessionToken};
use async_trait::async_trait;

/// A generic table read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRequest {
    pub table: String,
    pub fields: Vec<String>,
    /// ERP filter expression; empty reads every row
    pub filter: String,
}

impl TableRequest {
    pub fn new(table: impl Into<String>, fields: Vec<String>, filter: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields,
            filter: filter.into(),
        }
    }
}

/// Read access to the ERP
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Logs in and returns a session token for the following calls
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::AuthenticationFailed` when the ERP rejects the
    /// credentials, or a connection error when it cannot be reached.
    async fn authenticate(&self) -> Result<SessionToken>;

    /// Reads rows of a table matching `request.filter`
    async fn fetch_table(&self, request: &TableRequest, token: &SessionToken) -> Result<RawPage>;

    /// Runs a named query with its single changed-since parameter
    ///
    /// `since` is formatted `YYYY-MM-DD HH:MM:SS`.
    async fn fetch_named_query(
        &self,
        query_id: &str,
        since: &str,
        token: &SessionToken,
    ) -> Result<RawPage>;
}
