//! Error types for the Pulsejump relay

use thiserror::Error;

/// Errors that can occur in the relay core.
///
/// Errors from the biometric provider and the activity session host are
/// caught at the boundary and translated into state transitions plus status
/// text; they never propagate as uncaught faults. Publish errors are dropped
/// by policy. Nothing is retried automatically.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The platform has no health data capability at all. Terminal for the
    /// process; the feature stays unusable.
    #[error("Health data is not available")]
    BiometricDataUnavailable,

    /// The heart-rate read authorization was declined. Terminal until the
    /// host environment's permission state changes externally.
    #[error("Heart rate permission denied")]
    PermissionDenied,

    /// The heart-rate sampling capability was missing at session start.
    /// Recovered by forcing the session back to Idle.
    #[error("Heart rate sampling capability unavailable")]
    CapabilityUnavailable,

    /// The activity session host reported an unrecoverable failure.
    #[error("Activity session failed: {0}")]
    SessionFailure(String),

    /// The transport rejected a publish. Dropped by policy, never retried.
    #[error("Publish failed: {0}")]
    PublishFailure(String),

    /// The transport reported loss of connectivity.
    #[error("Transport disconnected")]
    TransportDisconnected,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RelayError {
    /// True for errors that end the current session attempt but leave the
    /// controller usable for a fresh cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RelayError::CapabilityUnavailable
                | RelayError::SessionFailure(_)
                | RelayError::PublishFailure(_)
                | RelayError::TransportDisconnected
        )
    }
}
