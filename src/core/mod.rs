//! Core reconciliation logic
//!
//! # Modules
//!
//! - [`normalize`] - raw ERP rows to typed, uniformly keyed records
//! - [`resolve`] - key normalization and the entity resolution index
//! - [`gate`] - parent validation for child records
//! - [`sync`] - strategy selection, classification, persistence, orchestration
//! - [`state`] - watermarks, resume progress and the execution log
//! - [`retry`] - retry with backoff for transient failures
//!
//! # Example
//!
//! ```rust,no_run
//! use parksync::adapters::memory::MemoryStore;
//! use parksync::config::load_config;
//! use parksync::core::state::StateManager;
//! use parksync::core::sync::{SyncCoordinator, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn example(source: Arc<dyn parksync::adapters::softone::RemoteSource>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(load_config("parksync.toml")?);
//! let store = Arc::new(MemoryStore::new());
//!
//! let coordinator = SyncCoordinator::new(config, store.clone(), StateManager::new_with_storage(store))
//!     .with_source("main", source);
//!
//! let outcome = coordinator
//!     .run_sync(&"softone-customers".parse()?, SyncOptions::manual())
//!     .await?;
//! println!("created {} updated {}", outcome.stats.created, outcome.stats.updated);
//! # Ok(())
//! # }
//! ```

pub mod gate;
pub mod normalize;
pub mod resolve;
pub mod retry;
pub mod state;
pub mod sync;
