//! Protocol constants.

/// Frame start marker.
pub const PACKET_PREFIX: [u8; 2] = [0xAA, 0x55];

/// Frame end marker.
pub const PACKET_SUFFIX: [u8; 2] = [0x0D, 0x0D];

/// Length of every frame on the bus.
pub const PACKET_LEN: usize = 21;

/// Header bytes used for frames we originate.
pub const HEADER_COMMAND: [u8; 2] = [0x30, 0xBC];

/// Address of the wallpad controller.
pub const WALLPAD_ADDRESS: u8 = 0x01;

/// Checksummed region of a frame (bytes 2..18).
pub const CHECKSUM_RANGE: std::ops::Range<usize> = 2..18;

/// Offset of the checksum byte.
pub const CHECKSUM_OFFSET: usize = 18;

/// Offset of the command byte.
pub const COMMAND_OFFSET: usize = 9;

/// Payload region of a frame.
pub const PAYLOAD_RANGE: std::ops::Range<usize> = 10..18;

/// Default capacity of the receive buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

// ============================================================================
// Command Bytes
// ============================================================================

/// State report / state set.
pub const CMD_STATE: u8 = 0x00;

/// Status query.
pub const CMD_QUERY: u8 = 0x3A;

/// Gas valve reports open; elevator call.
pub const CMD_OPEN: u8 = 0x01;

/// Gas valve close / reports closed.
pub const CMD_CLOSE: u8 = 0x02;

/// Motion detected.
pub const CMD_MOTION_DETECTED: u8 = 0x04;

/// Light cutoff on.
pub const CMD_CUTOFF_ON: u8 = 0x65;

/// Light cutoff off.
pub const CMD_CUTOFF_OFF: u8 = 0x66;
