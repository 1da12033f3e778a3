//! Error types for the gpdfan system

use thiserror::Error;

/// Core error type for fan control operations
#[derive(Error, Debug)]
pub enum GpdFanError {
    /// The embedded controller lock could not be acquired in time.
    ///
    /// Nothing was sent to the EC; the caller may retry.
    #[error("Embedded controller busy")]
    Busy,

    /// No supported board matched the hardware identity
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(String),

    /// Value outside the defined domain (rejected before any hardware access)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Write refused by the current PWM-enable mode
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation not defined for the requested attribute
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Port I/O transport errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for gpdfan operations
pub type Result<T> = std::result::Result<T, GpdFanError>;
