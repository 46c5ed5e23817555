//! Sync orchestration
//!
//! - [`coordinator`] - the `run_sync` state machine
//! - [`strategy`] - full vs. incremental fetch selection
//! - [`classify`] - new / updated / skipped decisions and the parent gate
//! - [`batch`] - batched persistence with per-record fallback
//! - [`options`] and [`summary`] - invocation options and results

pub mod batch;
pub mod classify;
pub mod coordinator;
pub mod options;
pub mod strategy;
pub mod summary;

pub use batch::{BatchResult, BatchWriter};
pub use classify::{Classification, ClassifyContext, PendingWrite, WriteAction};
pub use coordinator::SyncCoordinator;
pub use options::{SyncOptions, SyncTrigger};
pub use strategy::FetchStrategy;
pub use summary::{skip, ProgressInfo, SyncOutcome, SyncStats};
