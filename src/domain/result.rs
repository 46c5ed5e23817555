//! Result type alias for ParkSync

use super::errors::SyncError;

/// Result type alias for ParkSync operations
///
/// # Examples
///
/// ```
/// use parksync::domain::result::Result;
/// use parksync::domain::errors::SyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(SyncError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SyncError>;
