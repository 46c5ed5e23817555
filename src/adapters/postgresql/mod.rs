//! PostgreSQL database integration
//!
//! Stores synced ERP records, watermarks, resume progress and the execution
//! log in one PostgreSQL database.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::PostgreSQLWatermark;
