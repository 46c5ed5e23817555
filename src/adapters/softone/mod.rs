//! SoftOne ERP integration
//!
//! The [`RemoteSource`] trait is the seam the sync engine depends on;
//! [`SoftOneClient`] implements it over the SoftOne web services API.

pub mod client;
pub mod credentials;
pub mod models;
pub mod source;

pub use client::SoftOneClient;
pub use credentials::{CredentialDecryptor, PlaintextDecryptor};
pub use models::{RawPage, RawRow, ServiceResponse};
pub use source::{RemoteSource, TableRequest};
