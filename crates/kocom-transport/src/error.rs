//! Transport error types.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur on the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No stream is open.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    Closed,

    /// The connect attempt did not finish in time.
    #[error("connect to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Endpoint description.
        endpoint: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// A write did not complete in time; the stream was dropped.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The endpoint kind is not available in this build.
    #[error("endpoint not supported: {0}")]
    Unsupported(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
