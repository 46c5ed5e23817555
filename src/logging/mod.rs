//! Logging and observability
//!
//! Structured logging through `tracing`, with a console layer and a
//! rotating JSON file layer.
//!
//! # Example
//!
//! ```no_run
//! use parksync::logging::init_logging;
//! use parksync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(integration_id = "softone-contracts", "Sync scheduled");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a sync run
///
/// # Example
///
/// ```no_run
/// use parksync::log_sync_start;
///
/// log_sync_start!("softone-contracts", "contract", "manual");
/// ```
#[macro_export]
macro_rules! log_sync_start {
    ($integration_id:expr, $entity:expr, $trigger:expr) => {
        tracing::info!(
            integration_id = %$integration_id,
            entity = %$entity,
            trigger = %$trigger,
            "Starting sync"
        );
    };
}

/// Log the completion of a sync run
///
/// # Example
///
/// ```no_run
/// use parksync::log_sync_complete;
/// use std::time::Duration;
///
/// log_sync_complete!("softone-contracts", 12, 3, 0, 40, Duration::from_secs(10));
/// ```
#[macro_export]
macro_rules! log_sync_complete {
    ($integration_id:expr, $created:expr, $updated:expr, $errored:expr, $skipped:expr, $duration:expr) => {
        tracing::info!(
            integration_id = %$integration_id,
            created = $created,
            updated = $updated,
            errored = $errored,
            skipped = $skipped,
            duration_ms = $duration.as_millis() as u64,
            "Sync completed"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use parksync::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
