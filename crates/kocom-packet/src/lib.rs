//! Kocom wallpad bus frame codec.
//!
//! Every unit on the bus is a fixed 21-byte frame:
//!
//! ```text
//! +-------+-------+-----+------+------+------+------+-----+------------+-----+-------+
//! | AA 55 | 30 BC | pad | dDev | dRoom| sDev | sRoom| cmd | payload[8] | sum | 0D 0D |
//! +-------+-------+-----+------+------+------+------+-----+------------+-----+-------+
//!   0..2    2..4    4     5      6      7      8      9     10..18       18    19..21
//! ```
//!
//! The checksum is the sum of bytes 2..18 modulo 256. One end of every frame
//! addressed to or from us is the wallpad controller (`0x01`); the other end
//! is the *peer* device the frame describes.
//!
//! - [`Packet`] - a validated frame with pure field accessors and a builder
//! - [`FrameBuffer`] - recovers frames from an arbitrary byte stream
//!
//! # Example
//!
//! ```rust
//! use kocom_packet::{FrameBuffer, Packet, Address};
//!
//! let packet = Packet::build(Address::new(0x0E, 1), Address::WALLPAD, 0x00, [0xFF, 0, 0, 0, 0, 0, 0, 0]);
//!
//! let mut buffer = FrameBuffer::new();
//! buffer.push(&packet.as_bytes()[..7]);
//! assert!(buffer.next_frame().is_none());
//! buffer.push(&packet.as_bytes()[7..]);
//! assert_eq!(buffer.next_frame(), Some(packet));
//! ```

mod constants;
mod error;
mod frame;
mod packet;

pub use constants::*;
pub use error::*;
pub use frame::*;
pub use packet::*;
