//! Error types for live tracking.

use thiserror::Error;

use super::types::TrackerState;
use crate::settings::EmergencyError;

/// Error type for tracking operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    /// Operation is not allowed in the tracker's current state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// State the tracker was in.
        state: TrackerState,
    },

    /// Emergency override could not be activated.
    #[error("Emergency error: {0}")]
    Emergency(#[from] EmergencyError),

    /// The tracking actor is no longer running.
    #[error("Tracking actor has shut down")]
    ActorClosed,
}

/// Result type alias for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_display() {
        let err = TrackingError::InvalidState {
            operation: "start",
            state: TrackerState::Recording,
        };
        assert_eq!(err.to_string(), "Cannot start while recording");
    }

    #[test]
    fn emergency_error_converts() {
        let err = TrackingError::from(EmergencyError::NoRuntime);
        assert!(err.to_string().starts_with("Emergency error:"));
    }

    #[test]
    fn actor_closed_display() {
        assert_eq!(
            TrackingError::ActorClosed.to_string(),
            "Tracking actor has shut down"
        );
    }
}
