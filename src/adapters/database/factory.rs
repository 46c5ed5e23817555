//! Storage and remote source factory
//!
//! Builds the storage pair and the per-connection SoftOne clients from
//! configuration.

use crate::adapters::database::traits::{EntityStore, StateStorage};
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::softone::{PlaintextDecryptor, RemoteSource, SoftOneClient};
use crate::config::ParkSyncConfig;
use crate::domain::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Create the entity store and state storage from one connection pool
///
/// The schema is created if it does not exist yet.
///
/// # Errors
///
/// Returns an error if the pool cannot be built or the schema migration fails.
pub async fn create_store_and_state(
    config: &ParkSyncConfig,
) -> Result<(Arc<dyn EntityStore>, Arc<dyn StateStorage + Send + Sync>)> {
    tracing::info!("Creating PostgreSQL store and state storage");
    let client = Arc::new(PostgreSQLClient::new(config.postgresql.clone()).await?);
    client.ensure_schema().await?;
    let adapter = Arc::new(PostgreSQLAdapter::new_with_arc(client));

    Ok((
        adapter.clone() as Arc<dyn EntityStore>,
        adapter as Arc<dyn StateStorage + Send + Sync>,
    ))
}

/// Create one SoftOne client per configured connection, keyed by name
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built.
pub fn create_sources(config: &ParkSyncConfig) -> Result<HashMap<String, Arc<dyn RemoteSource>>> {
    config
        .connections
        .iter()
        .map(|connection| {
            let client = SoftOneClient::new(connection.clone(), Arc::new(PlaintextDecryptor))?;
            Ok((
                connection.name.clone(),
                Arc::new(client) as Arc<dyn RemoteSource>,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, ConnectionConfig};

    fn connection(name: &str) -> ConnectionConfig {
        ConnectionConfig {
            name: name.to_string(),
            base_url: "https://erp.example.com/s1services".to_string(),
            serial: "01100000000000".to_string(),
            app_id: "1001".to_string(),
            company: "1".to_string(),
            branch: "1".to_string(),
            module: "0".to_string(),
            refid: "1".to_string(),
            username: "sync".to_string(),
            password: secret_string("secret".to_string()),
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_create_sources_keys_by_connection_name() {
        let mut config: ParkSyncConfig = toml::from_str(
            r#"
            [postgresql]
            connection_string = "postgresql://parksync:pw@localhost:5432/parksync"
            "#,
        )
        .unwrap();
        config.connections = vec![connection("main"), connection("backup")];

        let sources = create_sources(&config).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources.contains_key("main"));
        assert!(sources.contains_key("backup"));
    }
}
