//! Domain models and types for ParkSync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Entity variants** ([`EntityKind`]) with their fixed sync properties
//! - **Records** ([`RemoteRecord`], [`LocalRecord`], [`ExistingRecord`]) and
//!   normalized identifiers ([`NormalizedKey`])
//! - **Strongly-typed identifiers** ([`IntegrationId`], [`SessionToken`])
//! - **Error types** ([`SyncError`], [`RemoteError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SyncError>`]:
//!
//! ```rust
//! use parksync::domain::{EntityKind, Result, SyncError};
//!
//! fn parse_kind(raw: &str) -> Result<EntityKind> {
//!     raw.parse().map_err(SyncError::Configuration)
//! }
//!
//! assert_eq!(parse_kind("contract_line").unwrap(), EntityKind::ContractLine);
//! assert!(parse_kind("INSTLINES").is_err());
//! ```

pub mod entity;
pub mod errors;
pub mod ids;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use entity::{EntityKind, ParentGate, UniqueIdKind, WriteStrategy};
pub use errors::{RecordFailure, RemoteError, StoreError, SyncError};
pub use ids::{IntegrationId, SessionToken};
pub use record::{ExistingRecord, FieldValue, LocalRecord, NormalizedKey, RemoteRecord};
pub use result::Result;
