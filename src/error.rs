//! Error types for queue, batch and export operations

use crate::types::{ImageId, ImageStatus};
use thiserror::Error;

/// Result type alias for studio operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Error types for the image queue and its collaborators
#[derive(Error, Debug)]
pub enum StudioError {
    /// Non-image input offered to the queue or the custom background slot
    #[error("Invalid intake: {0}")]
    InvalidIntake(String),

    /// Transport failure or non-success response from the removal service
    #[error("Remote failure: {0}")]
    RemoteFailure(String),

    /// A status change the record lifecycle does not allow
    #[error("Invalid transition for image {id}: cannot apply '{event}' while {from}")]
    InvalidTransition {
        id: ImageId,
        from: ImageStatus,
        event: &'static str,
    },

    /// A batch run or re-process is already active
    #[error("Batch processing is already running")]
    Busy,

    /// Export requested without a processed result
    #[error("Nothing to export: {0}")]
    NothingToExport(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive packaging errors
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Parameter preset (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StudioError {
    /// Create a new invalid intake error
    pub fn invalid_intake<S: Into<String>>(msg: S) -> Self {
        Self::InvalidIntake(msg.into())
    }

    /// Create a new remote failure error
    pub fn remote<S: Into<String>>(msg: S) -> Self {
        Self::RemoteFailure(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new nothing-to-export error
    pub fn nothing_to_export<S: Into<String>>(msg: S) -> Self {
        Self::NothingToExport(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create remote failure for a non-success HTTP status
    pub fn remote_status(status: reqwest::StatusCode, url: &str) -> Self {
        Self::RemoteFailure(format!("Server error {} from {}", status, url))
    }

    /// Create remote failure for a transport-level error
    pub fn remote_transport(url: &str, error: &reqwest::Error) -> Self {
        Self::RemoteFailure(format!("Request to {} failed: {}", url, error))
    }

    /// Whether this error is recorded per-record rather than surfaced to the user
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteFailure(_))
    }
}
