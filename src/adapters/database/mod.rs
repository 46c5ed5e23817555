//! Storage abstraction layer
//!
//! Trait-based seams between the sync engine and its storage, so the engine
//! runs unchanged against PostgreSQL or the in-memory store.

pub mod factory;
pub mod traits;

pub use factory::{create_sources, create_store_and_state};
pub use traits::{EntityStore, StateStorage, MAX_IN_LIST};
