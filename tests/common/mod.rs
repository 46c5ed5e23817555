//! Shared fixtures for the sync integration tests
//!
//! `FixtureSource` serves canned ERP rows per table and records every
//! request; `test_config` declares one integration per entity kind.

#![allow(dead_code)]

use async_trait::async_trait;
use parksync::adapters::memory::MemoryStore;
use parksync::adapters::softone::{RawPage, RawRow, RemoteSource, TableRequest};
use parksync::config::ParkSyncConfig;
use parksync::core::retry::RetryPolicy;
use parksync::core::state::StateManager;
use parksync::core::sync::SyncCoordinator;
use parksync::domain::{
    EntityKind, IntegrationId, LocalRecord, RemoteError, Result, SessionToken, SyncError,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CUSTOMERS: &str = "softone-customers";
pub const CUSTOMERS_NQ: &str = "softone-customers-nq";
pub const CONTRACTS: &str = "softone-contracts";
pub const CONTRACT_LINES: &str = "softone-contract-lines";
pub const ITEMS: &str = "softone-items";

pub const CHANGED_CUSTOMERS_QUERY: &str = "ParkSync.ChangedCustomers";

const CONFIG: &str = r#"
[sync]
run_timeout_secs = 60

[[connections]]
name = "main"
base_url = "https://tenant.oncloud.gr/s1services"
serial = "01100000000000"
app_id = "1001"
company = "1000"
branch = "1000"
module = "0"
refid = "15"
username = "sync"
password = "secret"

[[integrations]]
id = "softone-customers"
entity = "customer"
connection = "main"
remote_object = "CUSTOMER"
remote_table = "TRDR"
fields = ["TRDR", "CODE", "NAME", "INSDATE", "UPDDATE"]
unique_remote_field = "CODE"
unique_local_field = "erp_code"
primary_key_field = "TRDR"

[integrations.field_mapping]
CODE = "erp_code"
NAME = "name"

[[integrations]]
id = "softone-customers-nq"
entity = "customer"
connection = "main"
remote_object = "CUSTOMER"
remote_table = "TRDR"
fields = ["TRDR", "CODE", "NAME", "INSDATE", "UPDDATE"]
unique_remote_field = "CODE"
unique_local_field = "erp_code"
primary_key_field = "TRDR"
named_query = "ParkSync.ChangedCustomers"

[integrations.field_mapping]
CODE = "erp_code"
NAME = "name"

[[integrations]]
id = "softone-contracts"
entity = "contract"
connection = "main"
remote_object = "INST"
remote_table = "INST"
fields = ["INST", "CODE", "TRDR", "INSDATE", "UPDDATE"]
unique_remote_field = "INST"
unique_local_field = "erp_id"

[integrations.field_mapping]
INST = "erp_id"
CODE = "code"
TRDR = "customer_id"

[[integrations]]
id = "softone-contract-lines"
entity = "contract_line"
connection = "main"
remote_object = "INST"
remote_table = "INSTLINES"
fields = ["INSTLINES", "INST", "MTRL", "QTY"]
unique_remote_field = "INSTLINES"
unique_local_field = "erp_line_id"
parent_remote_field = "INST"

[integrations.field_mapping]
INSTLINES = "erp_line_id"
INST = "contract_id"
MTRL = "item_id"
QTY = "qty"

[[integrations]]
id = "softone-items"
entity = "item"
connection = "main"
remote_object = "ITEM"
remote_table = "MTRL"
fields = ["MTRL", "CODE", "NAME", "INSDATE", "UPDDATE"]
unique_remote_field = "CODE"
unique_local_field = "erp_code"
primary_key_field = "MTRL"

[integrations.field_mapping]
CODE = "erp_code"
NAME = "name"

[postgresql]
connection_string = "postgresql://parksync:pw@localhost:5432/parksync"
"#;

pub fn test_config() -> ParkSyncConfig {
    let config: ParkSyncConfig = toml::from_str(CONFIG).unwrap();
    config.validate().unwrap();
    config
}

pub fn id(raw: &str) -> IntegrationId {
    raw.parse().unwrap()
}

/// One keyed ERP row from a JSON object
pub fn row(value: Value) -> RawRow {
    match value {
        Value::Object(fields) => RawRow::Keyed(fields),
        other => panic!("row fixture must be an object, got {other}"),
    }
}

/// A record as an earlier run would have stored it
pub fn local(kind: EntityKind, pk: i64, unique: &str, fields: Value) -> LocalRecord {
    let fields: Map<String, Value> = match fields {
        Value::Object(map) => map,
        other => panic!("local fixture must be an object, got {other}"),
    };
    LocalRecord::new(kind, pk, unique, fields)
}

/// A request the fixture received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Table { table: String, filter: String },
    Named { query: String, since: String },
}

/// Canned ERP responses keyed by table and named query
#[derive(Default)]
pub struct FixtureSource {
    tables: HashMap<String, Vec<RawRow>>,
    named: HashMap<String, Vec<RawRow>>,
    named_query_down: bool,
    named_query_rejected: bool,
    auth_rejected: bool,
    auth_latency: Option<Duration>,
    failing_filters: HashSet<String>,
    requests: Mutex<Vec<Request>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, rows: Vec<RawRow>) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }

    pub fn with_named_query(mut self, query: &str, rows: Vec<RawRow>) -> Self {
        self.named.insert(query.to_string(), rows);
        self
    }

    /// Named queries fail with a connection error
    pub fn named_query_down(mut self) -> Self {
        self.named_query_down = true;
        self
    }

    /// Named queries fail with a permanent service error
    pub fn named_query_rejected(mut self) -> Self {
        self.named_query_rejected = true;
        self
    }

    /// Authentication answers only after `latency`
    pub fn slow_auth(mut self, latency: Duration) -> Self {
        self.auth_latency = Some(latency);
        self
    }

    pub fn reject_auth(mut self) -> Self {
        self.auth_rejected = true;
        self
    }

    /// Table reads with exactly this filter fail permanently
    pub fn fail_filter(mut self, filter: &str) -> Self {
        self.failing_filters.insert(filter.to_string());
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn table_filters(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Table { filter, .. } => Some(filter),
                Request::Named { .. } => None,
            })
            .collect()
    }

    fn record(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }
}

/// Applies a `TABLE.FIELD=VALUE` filter; other filters return every row
fn apply_filter(rows: &[RawRow], filter: &str) -> Vec<RawRow> {
    let Some((lhs, wanted)) = filter.split_once('=') else {
        return rows.to_vec();
    };
    if filter.contains('>') {
        return rows.to_vec();
    }
    let field = lhs.rsplit('.').next().unwrap_or(lhs);
    let wanted = wanted.trim().trim_start_matches('0');

    rows.iter()
        .filter(|row| match row {
            RawRow::Keyed(fields) => fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field))
                .map(|(_, value)| {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    text.trim().trim_start_matches('0') == wanted
                })
                .unwrap_or(false),
            RawRow::Positional(_) => true,
        })
        .cloned()
        .collect()
}

#[async_trait]
impl RemoteSource for FixtureSource {
    async fn authenticate(&self) -> Result<SessionToken> {
        if let Some(latency) = self.auth_latency {
            tokio::time::sleep(latency).await;
        }
        if self.auth_rejected {
            return Err(RemoteError::AuthenticationFailed("Invalid credentials".into()).into());
        }
        Ok(SessionToken::new("fixture-session".to_string()))
    }

    async fn fetch_table(&self, request: &TableRequest, _token: &SessionToken) -> Result<RawPage> {
        self.record(Request::Table {
            table: request.table.clone(),
            filter: request.filter.clone(),
        });

        if self.failing_filters.contains(&request.filter) {
            return Err(SyncError::Remote(RemoteError::ClientError {
                status: 400,
                message: format!("bad filter {}", request.filter),
            }));
        }

        let rows = self
            .tables
            .get(&request.table)
            .map(|rows| apply_filter(rows, &request.filter))
            .unwrap_or_default();
        Ok(RawPage {
            rows,
            keys: Vec::new(),
        })
    }

    async fn fetch_named_query(
        &self,
        query_id: &str,
        since: &str,
        _token: &SessionToken,
    ) -> Result<RawPage> {
        self.record(Request::Named {
            query: query_id.to_string(),
            since: since.to_string(),
        });

        if self.named_query_down {
            return Err(RemoteError::ConnectionFailed("connection reset by peer".into()).into());
        }
        if self.named_query_rejected {
            return Err(RemoteError::ServiceFailed(format!("Unknown query {query_id}")).into());
        }
        Ok(RawPage {
            rows: self.named.get(query_id).cloned().unwrap_or_default(),
            keys: Vec::new(),
        })
    }
}

/// Coordinator over a memory store, with retries that never wait
pub fn coordinator(
    config: ParkSyncConfig,
    store: Arc<MemoryStore>,
    source: Arc<FixtureSource>,
) -> SyncCoordinator {
    SyncCoordinator::new(
        Arc::new(config),
        store.clone(),
        StateManager::new_with_storage(store),
    )
    .with_source("main", source)
    .with_retry_policy(RetryPolicy::immediate(3))
}
