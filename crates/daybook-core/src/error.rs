//! Error types for Daybook core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer maps these
//! to user-friendly messages.

use thiserror::Error;

/// Result type alias for Daybook operations.
pub type Result<T> = std::result::Result<T, DaybookError>;

/// Core error type for Daybook operations.
#[derive(Debug, Error)]
pub enum DaybookError {
    /// A record or export document declares a schema version with no
    /// registered migration path. Fatal to that load/import; existing
    /// data is left untouched.
    #[error("Unsupported schema version {declared} (highest supported is {highest})")]
    UnsupportedSchemaVersion { declared: i64, highest: u32 },

    /// Underlying persistence layer inaccessible. Surfaced to the user
    /// as a save failure; the operation is retryable.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A numeric mutation was applied to a list-typed activity detail or
    /// vice versa. The stored value is left unchanged.
    #[error("Activity detail for '{activity}' holds a {held} value, not a {requested} value")]
    DetailKindMismatch {
        activity: String,
        held: &'static str,
        requested: &'static str,
    },

    /// A list-item mutation referenced an index outside the current list.
    #[error("List index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A cooperative cancellation point was hit; partial results were
    /// discarded.
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error (fallback)
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for DaybookError {
    fn from(err: std::io::Error) -> Self {
        DaybookError::StorageUnavailable(err.to_string())
    }
}

impl From<rusqlite::Error> for DaybookError {
    fn from(err: rusqlite::Error) -> Self {
        DaybookError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for DaybookError {
    fn from(err: serde_json::Error) -> Self {
        DaybookError::Validation(err.to_string())
    }
}
