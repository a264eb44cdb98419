//! Error types for kocom-packet.

use thiserror::Error;

/// Errors that can occur when validating a raw frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Frame is not exactly [`crate::PACKET_LEN`] bytes.
    #[error("Invalid frame length: {len} bytes (expected {expected})")]
    InvalidLength {
        /// Actual length.
        len: usize,
        /// Required length.
        expected: usize,
    },

    /// Frame does not start with `AA 55`.
    #[error("Invalid frame prefix: {0:02x?}")]
    InvalidPrefix([u8; 2]),

    /// Frame does not end with `0D 0D`.
    #[error("Invalid frame suffix: {0:02x?}")]
    InvalidSuffix([u8; 2]),

    /// Checksum byte does not match the frame contents.
    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the frame.
        expected: u8,
        /// Checksum carried in the frame.
        actual: u8,
    },

    /// Hex text could not be decoded.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

/// Result type for packet operations.
pub type PacketResult<T> = Result<T, PacketError>;
