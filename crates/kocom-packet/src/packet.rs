//! The fixed-length bus frame.

use crate::constants::*;
use crate::{PacketError, PacketResult};
use std::fmt;

// ============================================================================
// Address
// ============================================================================

/// A (device code, room) address pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address {
    /// Device code.
    pub device: u8,
    /// Room number.
    pub room: u8,
}

impl Address {
    /// The wallpad controller.
    pub const WALLPAD: Address = Address {
        device: WALLPAD_ADDRESS,
        room: 0x00,
    };

    /// Address used when neither end of a frame is the wallpad.
    pub const NULL: Address = Address { device: 0, room: 0 };

    /// Create an address.
    pub const fn new(device: u8, room: u8) -> Self {
        Address { device, room }
    }

    /// Whether this address belongs to the wallpad controller.
    pub const fn is_wallpad(&self) -> bool {
        self.device == WALLPAD_ADDRESS
    }
}

/// Sum of bytes 2..18 of a frame modulo 256.
///
/// `frame` must hold at least 18 bytes.
pub fn compute_checksum(frame: &[u8]) -> u8 {
    frame[CHECKSUM_RANGE]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
}

// ============================================================================
// Packet
// ============================================================================

/// A structurally valid 21-byte frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet {
    raw: [u8; PACKET_LEN],
}

impl Packet {
    /// Validate length, prefix and suffix of a raw frame.
    ///
    /// The checksum is not checked here; see [`Packet::verify_checksum`].
    pub fn from_bytes(data: &[u8]) -> PacketResult<Self> {
        let raw: [u8; PACKET_LEN] = data.try_into().map_err(|_| PacketError::InvalidLength {
            len: data.len(),
            expected: PACKET_LEN,
        })?;

        if raw[..2] != PACKET_PREFIX {
            return Err(PacketError::InvalidPrefix([raw[0], raw[1]]));
        }
        if raw[PACKET_LEN - 2..] != PACKET_SUFFIX {
            return Err(PacketError::InvalidSuffix([
                raw[PACKET_LEN - 2],
                raw[PACKET_LEN - 1],
            ]));
        }

        Ok(Packet { raw })
    }

    /// Validate a frame and its checksum.
    pub fn from_bytes_checked(data: &[u8]) -> PacketResult<Self> {
        let packet = Self::from_bytes(data)?;
        packet.verify_checksum()?;
        Ok(packet)
    }

    /// Parse a frame from hex text, checksum included.
    pub fn from_hex(text: &str) -> PacketResult<Self> {
        let bytes = hex::decode(text.trim()).map_err(|e| PacketError::InvalidHex(e.to_string()))?;
        Self::from_bytes_checked(&bytes)
    }

    /// Build an outbound frame with the command header.
    pub fn build(dest: Address, src: Address, command: u8, payload: [u8; 8]) -> Self {
        Self::build_with_header(HEADER_COMMAND, dest, src, command, payload)
    }

    /// Build a frame with an explicit 2-byte header.
    pub fn build_with_header(
        header: [u8; 2],
        dest: Address,
        src: Address,
        command: u8,
        payload: [u8; 8],
    ) -> Self {
        let mut raw = [0u8; PACKET_LEN];
        raw[..2].copy_from_slice(&PACKET_PREFIX);
        raw[2..4].copy_from_slice(&header);
        raw[4] = 0x00;
        raw[5] = dest.device;
        raw[6] = dest.room;
        raw[7] = src.device;
        raw[8] = src.room;
        raw[COMMAND_OFFSET] = command;
        raw[PAYLOAD_RANGE].copy_from_slice(&payload);
        raw[CHECKSUM_OFFSET] = compute_checksum(&raw);
        raw[PACKET_LEN - 2..].copy_from_slice(&PACKET_SUFFIX);
        Packet { raw }
    }

    /// Raw frame bytes.
    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.raw
    }

    /// Copy the raw frame into a `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.raw.to_vec()
    }

    /// Lowercase hex rendering of the frame.
    pub fn to_hex(&self) -> String {
        hex::encode(self.raw)
    }

    /// Packet type: high nibble of byte 3.
    pub fn packet_type(&self) -> u8 {
        self.raw[3] >> 4
    }

    /// Destination address.
    pub fn dest(&self) -> Address {
        Address::new(self.raw[5], self.raw[6])
    }

    /// Source address.
    pub fn src(&self) -> Address {
        Address::new(self.raw[7], self.raw[8])
    }

    /// Command byte.
    pub fn command(&self) -> u8 {
        self.raw[COMMAND_OFFSET]
    }

    /// The 8 payload bytes.
    pub fn payload(&self) -> [u8; 8] {
        let mut payload = [0u8; 8];
        payload.copy_from_slice(&self.raw[PAYLOAD_RANGE]);
        payload
    }

    /// Checksum byte carried in the frame.
    pub fn checksum(&self) -> u8 {
        self.raw[CHECKSUM_OFFSET]
    }

    /// Check the carried checksum against the frame contents.
    pub fn verify_checksum(&self) -> PacketResult<()> {
        let expected = compute_checksum(&self.raw);
        if expected == self.checksum() {
            Ok(())
        } else {
            Err(PacketError::ChecksumMismatch {
                expected,
                actual: self.checksum(),
            })
        }
    }

    /// The device end of the frame.
    ///
    /// If the wallpad is the destination the peer is the source, if the
    /// wallpad is the source the peer is the destination, otherwise
    /// [`Address::NULL`].
    pub fn peer(&self) -> Address {
        let dest = self.dest();
        let src = self.src();
        if dest.is_wallpad() {
            src
        } else if src.is_wallpad() {
            dest
        } else {
            Address::NULL
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("type", &format_args!("{:#x}", self.packet_type()))
            .field("dest", &format_args!("{:02x}{:02x}", self.raw[5], self.raw[6]))
            .field("src", &format_args!("{:02x}{:02x}", self.raw[7], self.raw[8]))
            .field("command", &format_args!("{:#04x}", self.command()))
            .field("payload", &format_args!("{}", hex::encode(self.payload())))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<&[u8]> for Packet {
    type Error = PacketError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Packet::from_bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_report() -> Packet {
        Packet::build(
            Address::WALLPAD,
            Address::new(0x0E, 0x01),
            CMD_STATE,
            [0xFF, 0, 0, 0, 0, 0, 0, 0],
        )
    }

    #[test]
    fn test_build_layout() {
        let packet = light_report();
        let raw = packet.as_bytes();
        assert_eq!(&raw[..5], &[0xAA, 0x55, 0x30, 0xBC, 0x00]);
        assert_eq!(&raw[5..9], &[0x01, 0x00, 0x0E, 0x01]);
        assert_eq!(raw[9], 0x00);
        assert_eq!(raw[10], 0xFF);
        assert_eq!(&raw[19..], &[0x0D, 0x0D]);
        assert!(packet.verify_checksum().is_ok());
    }

    #[test]
    fn test_checksum_value() {
        // 30 + BC + 01 + 0E + 01 + FF = 0x1FB
        assert_eq!(light_report().checksum(), 0xFB);
    }

    #[test]
    fn test_accessors() {
        let packet = light_report();
        assert_eq!(packet.packet_type(), 0x0B);
        assert_eq!(packet.dest(), Address::WALLPAD);
        assert_eq!(packet.src(), Address::new(0x0E, 0x01));
        assert_eq!(packet.command(), 0x00);
        assert_eq!(packet.payload(), [0xFF, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_peer_resolution() {
        let report = light_report();
        assert_eq!(report.peer(), Address::new(0x0E, 0x01));

        let command = Packet::build(Address::new(0x36, 2), Address::WALLPAD, 0, [0; 8]);
        assert_eq!(command.peer(), Address::new(0x36, 2));

        let stray = Packet::build(Address::new(0x36, 2), Address::new(0x0E, 1), 0, [0; 8]);
        assert_eq!(stray.peer(), Address::NULL);
    }

    #[test]
    fn test_from_bytes_validation() {
        let raw = light_report().to_vec();
        assert_eq!(Packet::from_bytes(&raw).unwrap(), light_report());

        assert_eq!(
            Packet::from_bytes(&raw[..20]),
            Err(PacketError::InvalidLength { len: 20, expected: 21 })
        );

        let mut bad_prefix = raw.clone();
        bad_prefix[1] = 0x56;
        assert!(matches!(
            Packet::from_bytes(&bad_prefix),
            Err(PacketError::InvalidPrefix(_))
        ));

        let mut bad_suffix = raw.clone();
        bad_suffix[20] = 0x0A;
        assert!(matches!(
            Packet::from_bytes(&bad_suffix),
            Err(PacketError::InvalidSuffix(_))
        ));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut raw = light_report().to_vec();
        raw[12] ^= 0x01;
        let packet = Packet::from_bytes(&raw).unwrap();
        assert!(matches!(
            packet.verify_checksum(),
            Err(PacketError::ChecksumMismatch { .. })
        ));
        assert!(Packet::from_bytes_checked(&raw).is_err());
    }

    #[test]
    fn test_hex_roundtrip() {
        let packet = light_report();
        assert_eq!(Packet::from_hex(&packet.to_hex()).unwrap(), packet);
        assert!(matches!(Packet::from_hex("zz"), Err(PacketError::InvalidHex(_))));
    }
}
