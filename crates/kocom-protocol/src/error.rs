//! Protocol error types.

use kocom_common::DeviceType;
use thiserror::Error;

/// Errors produced while turning an action into a bus command.
///
/// Decoding never fails; frames that carry nothing we understand simply
/// produce no states.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// The device type has no command encoding.
    #[error("device type {0} cannot be commanded")]
    UnsupportedDevice(DeviceType),

    /// The device type does not support this action.
    #[error("action '{action}' is not supported by {device_type}")]
    UnsupportedAction {
        /// Device type addressed.
        device_type: DeviceType,
        /// Action name.
        action: &'static str,
    },

    /// Action name is not recognized.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A required argument was not supplied.
    #[error("missing argument '{0}'")]
    MissingArgument(&'static str),

    /// An argument was supplied with the wrong type or range.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A mode name does not map to a wire code.
    #[error("unknown {kind} '{name}'")]
    UnknownMode {
        /// Which mode table was consulted.
        kind: &'static str,
        /// The name that failed to resolve.
        name: String,
    },
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
