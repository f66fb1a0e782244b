//! Error types for the settings module.

use thiserror::Error;

/// Error type for emergency override operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmergencyError {
    /// No Tokio runtime is available to schedule the expiry timer.
    #[error("No async runtime available to schedule emergency expiry")]
    NoRuntime,
}

/// Result type alias for emergency override operations.
pub type Result<T> = std::result::Result<T, EmergencyError>;
