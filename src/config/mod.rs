//! Configuration management for ParkSync.
//!
//! # Overview
//!
//! ParkSync uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PARKSYNC_*` environment overrides
//! - Default values for optional settings
//! - Validation with descriptive messages
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run flag
//! - [`SyncConfig`] - Run ceiling, resume window, full-sync limit, retries
//! - [`ConnectionConfig`] - SoftOne tenant credentials (`[[connections]]`)
//! - [`IntegrationConfig`] - One sync pipeline (`[[integrations]]`)
//! - [`PostgreSQLConfig`] - Local store
//! - [`LoggingConfig`] - Local JSON log files
//!
//! # Example Configuration
//!
//! ```toml
//! [sync]
//! run_timeout_secs = 1800
//!
//! [[connections]]
//! name = "main"
//! base_url = "https://tenant.oncloud.gr/s1services"
//! serial = "01100"
//! app_id = "1001"
//! company = "1000"
//! branch = "1000"
//! module = "0"
//! refid = "1"
//! username = "ws"
//! password = "${PARKSYNC_SOFTONE_PASSWORD}"
//!
//! [[integrations]]
//! id = "softone-contracts"
//! entity = "contract"
//! connection = "main"
//! remote_object = "INST"
//! remote_table = "INST"
//! fields = ["INST", "TRDR", "NAME", "INSDATE", "UPDDATE"]
//! unique_remote_field = "INST"
//! unique_local_field = "erp_id"
//! schedule = "15m"
//!
//! [integrations.field_mapping]
//! INST = "erp_id"
//! TRDR = "customer_id"
//! NAME = "name"
//!
//! [postgresql]
//! connection_string = "${PARKSYNC_DATABASE_URL}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, DEFAULT_CONFIG_FILE};
pub use schema::{
    ApplicationConfig, ConnectionConfig, IntegrationConfig, LoggingConfig, ParkSyncConfig,
    PostgreSQLConfig, RetryConfig, SyncConfig, SyncDirection,
};
pub use secret::{secret_string, SecretString, SecretValue};
