//! Frame recovery from a raw byte stream.
//!
//! Bytes arrive in arbitrary chunks from a serial line or a TCP bridge. The
//! [`FrameBuffer`] accumulates them and yields every well-formed frame it can
//! find, resynchronising one byte at a time when a candidate has a broken
//! suffix and dropping whole candidates whose checksum does not match.

use crate::constants::*;
use crate::packet::{compute_checksum, Packet};
use bytes::{Buf, BytesMut};
use log::{debug, trace};

/// Counters kept by a [`FrameBuffer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames yielded.
    pub frames_decoded: u64,
    /// Candidates dropped because the suffix was wrong.
    pub framing_errors: u64,
    /// Candidates dropped because the checksum was wrong.
    pub checksum_errors: u64,
    /// Bytes discarded while searching for a prefix or on overflow.
    pub bytes_discarded: u64,
}

/// A bounded accumulator that extracts frames from a byte stream.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Upper bound on buffered bytes.
    capacity: usize,
    stats: FrameStats,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a buffer holding at most `capacity` bytes.
    ///
    /// Capacities below one frame are raised to one frame.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(PACKET_LEN);
        FrameBuffer {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            stats: FrameStats::default(),
        }
    }

    /// Add received data to the buffer.
    ///
    /// When the buffer would exceed its capacity the oldest bytes are dropped.
    pub fn push(&mut self, data: &[u8]) {
        let data = if data.len() > self.capacity {
            let skip = data.len() - self.capacity;
            self.discard_all();
            self.stats.bytes_discarded += skip as u64;
            &data[skip..]
        } else {
            data
        };

        let overflow = (self.buffer.len() + data.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            debug!("frame buffer full, dropping {} oldest bytes", overflow);
            self.discard(overflow);
        }
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next valid frame.
    ///
    /// Returns `None` when more data is needed.
    pub fn next_frame(&mut self) -> Option<Packet> {
        loop {
            match find_prefix(&self.buffer) {
                Some(pos) => {
                    if pos > 0 {
                        trace!("skipping {} bytes before frame prefix", pos);
                        self.discard(pos);
                    }
                }
                None => {
                    // A trailing 0xAA may be the first half of a split prefix.
                    let keep = usize::from(self.buffer.last() == Some(&PACKET_PREFIX[0]));
                    let drop = self.buffer.len() - keep;
                    self.discard(drop);
                    return None;
                }
            }

            if self.buffer.len() < PACKET_LEN {
                return None;
            }

            if self.buffer[PACKET_LEN - 2..PACKET_LEN] != PACKET_SUFFIX {
                self.stats.framing_errors += 1;
                trace!("bad frame suffix, resyncing");
                self.discard(1);
                continue;
            }

            let expected = compute_checksum(&self.buffer[..PACKET_LEN]);
            let actual = self.buffer[CHECKSUM_OFFSET];
            if expected != actual {
                self.stats.checksum_errors += 1;
                debug!(
                    "checksum mismatch (expected {:#04x}, got {:#04x}): {}",
                    expected,
                    actual,
                    hex::encode(&self.buffer[..PACKET_LEN])
                );
                self.discard(PACKET_LEN);
                continue;
            }

            let frame = self.buffer.split_to(PACKET_LEN);
            match Packet::from_bytes(&frame) {
                Ok(packet) => {
                    self.stats.frames_decoded += 1;
                    return Some(packet);
                }
                // Prefix and suffix were checked above.
                Err(_) => continue,
            }
        }
    }

    /// Draining iterator over every frame currently extractable.
    ///
    /// The iterator ends when more data is needed; calling `frames()` again
    /// after another [`push`](Self::push) resumes where it left off.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { buffer: self }
    }

    /// Number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Maximum number of buffered bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Counters since creation.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Clear the buffer, keeping counters.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn discard(&mut self, n: usize) {
        let n = n.min(self.buffer.len());
        self.buffer.advance(n);
        self.stats.bytes_discarded += n as u64;
    }

    fn discard_all(&mut self) {
        self.discard(self.buffer.len());
    }
}

/// Iterator returned by [`FrameBuffer::frames`].
pub struct Frames<'a> {
    buffer: &'a mut FrameBuffer,
}

impl Iterator for Frames<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        self.buffer.next_frame()
    }
}

fn find_prefix(data: &[u8]) -> Option<usize> {
    data.windows(PACKET_PREFIX.len())
        .position(|w| w == PACKET_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Address;

    fn frame(room: u8, first: u8) -> Packet {
        Packet::build(
            Address::WALLPAD,
            Address::new(0x0E, room),
            CMD_STATE,
            [first, 0, 0, 0, 0, 0, 0, 0],
        )
    }

    fn stream() -> (Vec<u8>, Vec<Packet>) {
        let packets = vec![frame(1, 0xFF), frame(2, 0x00), frame(3, 0xFF)];
        let mut bytes = vec![0x12, 0xAA, 0x34];
        for p in &packets {
            bytes.extend_from_slice(p.as_bytes());
            bytes.push(0x00);
        }
        (bytes, packets)
    }

    #[test]
    fn test_single_frame() {
        let mut buffer = FrameBuffer::new();
        buffer.push(frame(1, 0xFF).as_bytes());
        assert_eq!(buffer.next_frame(), Some(frame(1, 0xFF)));
        assert_eq!(buffer.next_frame(), None);
        assert_eq!(buffer.stats().frames_decoded, 1);
    }

    #[test]
    fn test_partial_frame() {
        let mut buffer = FrameBuffer::new();
        let packet = frame(1, 0xFF);
        buffer.push(&packet.as_bytes()[..10]);
        assert!(buffer.next_frame().is_none());
        assert_eq!(buffer.buffered_len(), 10);
        buffer.push(&packet.as_bytes()[10..]);
        assert_eq!(buffer.next_frame(), Some(packet));
    }

    #[test]
    fn test_chunk_split_idempotence() {
        let (bytes, expected) = stream();
        for chunk in 1..=bytes.len() {
            let mut buffer = FrameBuffer::new();
            let mut got = Vec::new();
            for piece in bytes.chunks(chunk) {
                buffer.push(piece);
                got.extend(buffer.frames());
            }
            assert_eq!(got, expected, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_prefix_split_across_chunks() {
        let packet = frame(4, 0xFF);
        let mut buffer = FrameBuffer::new();
        buffer.push(&[0x00, 0x11, 0xAA]);
        assert!(buffer.next_frame().is_none());
        assert_eq!(buffer.buffered_len(), 1);
        buffer.push(&packet.as_bytes()[1..]);
        assert_eq!(buffer.next_frame(), Some(packet));
    }

    #[test]
    fn test_resync_after_broken_suffix() {
        let first = frame(1, 0xFF);
        let second = frame(2, 0xFF);
        let mut broken = frame(5, 0x00).to_vec();
        broken[20] = 0x00;

        let mut bytes = first.to_vec();
        bytes.extend_from_slice(&broken);
        bytes.extend_from_slice(second.as_bytes());

        let mut buffer = FrameBuffer::new();
        buffer.push(&bytes);
        let got: Vec<_> = buffer.frames().collect();
        assert_eq!(got, vec![first, second]);
        assert!(buffer.stats().framing_errors >= 1);
    }

    #[test]
    fn test_checksum_rejection_drops_only_that_frame() {
        let (_, packets) = stream();
        for index in 10..18 {
            let mut bytes = Vec::new();
            for (i, p) in packets.iter().enumerate() {
                let mut raw = p.to_vec();
                if i == 1 {
                    raw[index] = raw[index].wrapping_add(1);
                }
                bytes.extend_from_slice(&raw);
            }

            let mut buffer = FrameBuffer::new();
            buffer.push(&bytes);
            let got: Vec<_> = buffer.frames().collect();
            assert_eq!(got, vec![packets[0], packets[2]], "mutated byte {}", index);
            assert_eq!(buffer.stats().checksum_errors, 1);
        }
    }

    #[test]
    fn test_garbage_is_bounded() {
        let mut buffer = FrameBuffer::with_capacity(64);
        for _ in 0..100 {
            buffer.push(&[0x55; 50]);
            assert!(buffer.buffered_len() <= 64);
            assert!(buffer.next_frame().is_none());
        }
        assert_eq!(buffer.buffered_len(), 0);
    }

    #[test]
    fn test_oversized_push_keeps_newest_bytes() {
        let packet = frame(1, 0xFF);
        let mut bytes = vec![0x00; 100];
        bytes.extend_from_slice(packet.as_bytes());

        let mut buffer = FrameBuffer::with_capacity(32);
        buffer.push(&bytes);
        assert!(buffer.buffered_len() <= 32);
        assert_eq!(buffer.next_frame(), Some(packet));
    }

    #[test]
    fn test_frames_resumes_after_more_data() {
        let a = frame(1, 0xFF);
        let b = frame(2, 0xFF);
        let mut buffer = FrameBuffer::new();
        buffer.push(a.as_bytes());
        buffer.push(&b.as_bytes()[..5]);
        assert_eq!(buffer.frames().collect::<Vec<_>>(), vec![a]);
        buffer.push(&b.as_bytes()[5..]);
        assert_eq!(buffer.frames().collect::<Vec<_>>(), vec![b]);
    }
}
