// ParkSync - Parking facility ERP synchronization engine
// Copyright (c) 2025 ParkSync Contributors
// Licensed under the MIT License

//! # ParkSync - SoftOne ERP to PostgreSQL reconciliation
//!
//! ParkSync keeps the local database of a parking-facility platform in step
//! with the SoftOne ERP: customers, contracts, contract lines, items and
//! payments are pulled through the ERP web services, normalized, matched
//! against what is already stored, and written in batches.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface (`sync`, `run`, `status`, `validate-config`)
//! - [`core`] - Sync engine (normalization, resolution, gating, orchestration, state)
//! - [`adapters`] - SoftOne client, PostgreSQL storage, in-memory storage
//! - [`domain`] - Entity kinds, records, identifiers and errors
//! - [`config`] - TOML configuration with environment substitution
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parksync::cli::commands::build_coordinator;
//! use parksync::config::load_config;
//! use parksync::core::sync::SyncOptions;
//! use parksync::domain::IntegrationId;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(load_config("parksync.toml")?);
//!     let coordinator = build_coordinator(config).await?;
//!
//!     let id: IntegrationId = "softone-contracts".parse().map_err(anyhow::Error::msg)?;
//!     let outcome = coordinator.run_sync(&id, SyncOptions::scheduled()).await?;
//!
//!     println!("created {}, updated {}", outcome.stats.created, outcome.stats.updated);
//!     Ok(())
//! }
//! ```
//!
//! ## Incremental Sync
//!
//! Each integration keeps a watermark. Scheduled runs of entities with
//! reliable remote timestamps read only rows inserted or updated since the
//! watermark; manual runs always reconcile the full dataset. Records whose
//! mapped fields are unchanged since the last write are skipped.
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`], whose error type
//! [`domain::SyncError`] tells transient failures (connection, timeout, lock
//! wait) from permanent ones. Per-record failures never abort a run; they are
//! reported in the run outcome and the execution log.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
