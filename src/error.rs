//! Error types for dispatch and validation
//!
//! One crate-wide error enum; every fallible operation returns
//! [`Result`]. Dispatch-time faults are deliberately stringly-typed
//! (`reason`) because the device runtime behind the queue is an opaque
//! collaborator whose failures arrive as text.

use thiserror::Error;

/// Error type for harness operations
#[derive(Debug, Error)]
pub enum CotejarError {
    /// Index space does not evenly divide the buffer
    #[error("Invalid partition: {reason}")]
    InvalidPartition {
        /// Why the partition is invalid
        reason: String,
    },

    /// Buffer lengths disagree with the launch configuration
    #[error("Invalid shape: {reason}")]
    InvalidShape {
        /// Why the shapes disagree
        reason: String,
    },

    /// Device or runtime fault during kernel submission or execution
    #[error("Dispatch fault: {reason}")]
    DispatchFault {
        /// Fault text reported by the device runtime
        reason: String,
    },

    /// No usable device queue on this host
    #[error("Device unavailable: {reason}")]
    DeviceUnavailable {
        /// Why acquisition failed
        reason: String,
    },
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, CotejarError>;
