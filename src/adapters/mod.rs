//! External system integrations for ParkSync.
//!
//! - [`softone`] - SoftOne ERP web services client
//! - [`database`] - Storage traits and the factory wiring them up
//! - [`postgresql`] - PostgreSQL storage
//! - [`memory`] - In-memory storage for dry runs and tests
//!
//! # Example
//!
//! ```rust,no_run
//! use parksync::adapters::database::create_store_and_state;
//! use parksync::config::load_config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config("parksync.toml")?;
//! let (store, state) = create_store_and_state(&config).await?;
//! store.test_connection().await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
pub mod softone;
