//! Error types for session manager operations
//!
//! All adapter-call failures are caught at the session boundary and
//! converted to status messages; these types exist for the adapter and
//! permission seams and for callers of [`crate::SessionHandle`].

use scout_core::DeviceId;
use thiserror::Error;

/// Main error type for scout session operations
#[derive(Error, Debug)]
pub enum SessionError {
    // ===== Capability Errors =====
    /// BLE capability is missing entirely (no adapter on this host)
    #[error("BLE module not available")]
    AdapterUnavailable,

    /// The adapter exists but is powered off or could not be enabled
    #[error("Bluetooth adapter is disabled")]
    AdapterDisabled,

    /// The platform scan permission was not granted
    #[error("Location permission required for scanning")]
    PermissionDenied,

    // ===== Operation Errors =====
    /// Scan start was rejected by the platform
    #[error("Scan failed: {0}")]
    ScanFailed(String),

    /// A scan is already in progress
    #[error("A scan is already in progress")]
    AlreadyScanning,

    /// Connection attempt was rejected by the platform
    #[error("Connection to {id} failed: {reason}")]
    ConnectFailed {
        /// Target device
        id: DeviceId,
        /// Failure reason from the platform
        reason: String,
    },

    /// Disconnection attempt was rejected by the platform
    #[error("Disconnection from {id} failed: {reason}")]
    DisconnectFailed {
        /// Target device
        id: DeviceId,
        /// Failure reason from the platform
        reason: String,
    },

    // ===== General Errors =====
    /// The session task has stopped and its command channel is closed
    #[error("Session channel closed")]
    ChannelClosed,

    /// Platform-level failure with no finer classification
    #[error("Platform error: {0}")]
    Platform(String),
}

impl SessionError {
    /// Whether the user can recover by retrying (after fixing the cause).
    ///
    /// Only a missing BLE capability and a dead session are terminal for
    /// the remainder of the session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SessionError::AdapterUnavailable | SessionError::ChannelClosed
        )
    }

    /// Get an error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::AdapterUnavailable => "ADAPTER_UNAVAILABLE",
            SessionError::AdapterDisabled => "ADAPTER_DISABLED",
            SessionError::PermissionDenied => "PERMISSION_DENIED",
            SessionError::ScanFailed(_) => "SCAN_FAILED",
            SessionError::AlreadyScanning => "ALREADY_SCANNING",
            SessionError::ConnectFailed { .. } => "CONNECT_FAILED",
            SessionError::DisconnectFailed { .. } => "DISCONNECT_FAILED",
            SessionError::ChannelClosed => "CHANNEL_CLOSED",
            SessionError::Platform(_) => "PLATFORM_ERROR",
        }
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

// Conversion from tokio mpsc send error
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for SessionError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        SessionError::ChannelClosed
    }
}
