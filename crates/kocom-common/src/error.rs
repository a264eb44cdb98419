//! Error types for parsing common identifiers.

use thiserror::Error;

/// Errors produced when converting names or codes into common types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Device type name is not recognized.
    #[error("unknown device type: {0}")]
    UnknownDeviceType(String),

    /// Sub type name is not recognized.
    #[error("unknown sub type: {0}")]
    UnknownSubType(String),

    /// Platform name is not recognized.
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}
