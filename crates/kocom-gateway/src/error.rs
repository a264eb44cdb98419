//! Error types for gateway configuration and startup.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration or starting the gateway.
///
/// Runtime faults (bus I/O, unconfirmed commands) are never surfaced here;
/// they are retried internally and reported as a `false` command result.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadConfig {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseConfig(#[from] serde_yaml::Error),

    /// A replayed frame failed validation.
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] kocom_packet::PacketError),

    /// The gateway has already been stopped.
    #[error("gateway is stopped")]
    Stopped,
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
