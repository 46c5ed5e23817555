//! Domain error types
//!
//! This module defines the error hierarchy for ParkSync.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main ParkSync error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// ERP remote API errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Storage layer errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// State management errors (watermarks, progress, execution log)
    #[error("State management error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The run exceeded its wall-clock ceiling
    #[error("Sync run timed out after {0} seconds")]
    Timeout(u64),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Whether retrying the failed operation may succeed
    ///
    /// Connection refused, timeouts, DNS failures, pool exhaustion and
    /// lock-wait timeouts are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Remote(e) => e.is_transient(),
            SyncError::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether this is a duplicate-key conflict from the storage layer
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, SyncError::Store(StoreError::DuplicateKey(_)))
    }
}

/// SoftOne remote API errors
///
/// These errors don't expose the HTTP client's types.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Failed to connect (refused, reset, DNS)
    #[error("Failed to connect to ERP: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Login or authenticate call rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service answered with `success: false`
    #[error("Service call failed: {0}")]
    ServiceFailed(String),

    /// Response body could not be understood
    #[error("Invalid response from ERP: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },
}

impl RemoteError {
    /// Whether the error is worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::ConnectionFailed(_) | RemoteError::Timeout(_) => true,
            RemoteError::ServerError { status, .. } => matches!(status, 502..=504),
            RemoteError::ServiceFailed(msg) => looks_transient(msg),
            _ => false,
        }
    }
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the database or obtain a pooled connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Lock wait / statement timeout / deadlock
    #[error("Lock wait timeout: {0}")]
    LockTimeout(String),

    /// Unique constraint violation
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Read failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Write failed for a non-transient reason
    #[error("Write failed: {0}")]
    WriteFailed(String),
}

impl StoreError {
    /// Whether the error is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed(_) | StoreError::LockTimeout(_)
        )
    }
}

/// Match the error texts the ERP and network stacks use for transient failures
pub fn looks_transient(message: &str) -> bool {
    const MARKERS: [&str; 9] = [
        "econnrefused",
        "connection refused",
        "etimedout",
        "timed out",
        "enotfound",
        "dns error",
        "econnreset",
        "too many connections",
        "pool",
    ];
    let lower = message.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
}

/// A single record that could not be persisted
#[derive(Debug, Clone)]
pub struct RecordFailure {
    /// Unique identifier of the failed record, as received
    pub unique_id: String,

    /// Error message
    pub error: String,
}

impl RecordFailure {
    /// Creates a new record failure
    pub fn new(unique_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            error: error.into(),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_remote_error_conversion() {
        let remote_err = RemoteError::ConnectionFailed("Network error".to_string());
        let sync_err: SyncError = remote_err.into();
        assert!(matches!(sync_err, SyncError::Remote(_)));
        assert!(sync_err.is_transient());
    }

    #[test]
    fn test_store_error_classification() {
        let lock: SyncError = StoreError::LockTimeout("55P03".to_string()).into();
        assert!(lock.is_transient());
        assert!(!lock.is_duplicate_key());

        let dup: SyncError = StoreError::DuplicateKey("synced_records_pkey".to_string()).into();
        assert!(!dup.is_transient());
        assert!(dup.is_duplicate_key());
    }

    #[test]
    fn test_auth_failure_is_not_transient() {
        let err: SyncError = RemoteError::AuthenticationFailed("bad password".to_string()).into();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_service_failure_with_transient_text() {
        assert!(RemoteError::ServiceFailed("connect ETIMEDOUT 10.0.0.4:443".into()).is_transient());
        assert!(!RemoteError::ServiceFailed("Invalid table INSTX".into()).is_transient());
    }

    #[test]
    fn test_gateway_errors_are_transient() {
        let err = RemoteError::ServerError {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
        let err = RemoteError::ServerError {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let sync_err: SyncError = io_err.into();
        assert!(matches!(sync_err, SyncError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let sync_err: SyncError = toml_err.into();
        assert!(matches!(sync_err, SyncError::Configuration(_)));
        assert!(sync_err.to_string().contains("TOML parse error"));
    }
}
