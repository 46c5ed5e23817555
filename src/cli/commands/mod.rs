//! CLI command implementations
//!
//! Shared exit codes and the wiring from configuration to a ready
//! [`SyncCoordinator`].

pub mod run;
pub mod status;
pub mod sync;
pub mod validate;

use crate::adapters::database::{create_sources, create_store_and_state};
use crate::config::ParkSyncConfig;
use crate::core::state::{RunStatus, StateManager};
use crate::core::sync::SyncCoordinator;
use crate::domain::{RemoteError, Result, StoreError, SyncError};
use std::sync::Arc;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_CONNECTION: i32 = 4;
pub const EXIT_FAILURE: i32 = 5;

/// Exit code for a run that reached persistence
pub fn exit_code_for_status(status: RunStatus) -> i32 {
    match status {
        RunStatus::Success => EXIT_SUCCESS,
        RunStatus::Partial => EXIT_PARTIAL,
        RunStatus::Failed => EXIT_FAILURE,
    }
}

/// Exit code for an aborted run
pub fn exit_code_for_error(error: &SyncError) -> i32 {
    match error {
        SyncError::Configuration(_) => EXIT_CONFIG,
        SyncError::Remote(RemoteError::ConnectionFailed(_))
        | SyncError::Remote(RemoteError::Timeout(_))
        | SyncError::Store(StoreError::ConnectionFailed(_)) => EXIT_CONNECTION,
        _ => EXIT_FAILURE,
    }
}

/// Builds a coordinator with PostgreSQL storage and one SoftOne client per connection
pub async fn build_coordinator(config: Arc<ParkSyncConfig>) -> Result<SyncCoordinator> {
    let (store, state) = create_store_and_state(&config).await?;
    store.test_connection().await?;

    let sources = create_sources(&config)?;
    let coordinator = sources.into_iter().fold(
        SyncCoordinator::new(config, store, StateManager::new_with_storage(state)),
        |coordinator, (name, source)| coordinator.with_source(name, source),
    );
    Ok(coordinator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(RunStatus::Success, 0)]
    #[test_case(RunStatus::Partial, 1)]
    #[test_case(RunStatus::Failed, 5)]
    fn test_exit_code_for_status(status: RunStatus, expected: i32) {
        assert_eq!(exit_code_for_status(status), expected);
    }

    #[test]
    fn test_exit_code_for_error() {
        assert_eq!(
            exit_code_for_error(&SyncError::Configuration("missing".into())),
            EXIT_CONFIG
        );
        assert_eq!(
            exit_code_for_error(&RemoteError::ConnectionFailed("refused".into()).into()),
            EXIT_CONNECTION
        );
        assert_eq!(
            exit_code_for_error(&StoreError::ConnectionFailed("pool".into()).into()),
            EXIT_CONNECTION
        );
        assert_eq!(exit_code_for_error(&SyncError::Timeout(1800)), EXIT_FAILURE);
    }
}
