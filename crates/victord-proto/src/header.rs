//! Fixed 4-byte frame header: a 4-bit opcode packed with a 28-bit length.
//!
//! Unlike a structure with named byte ranges, the header here is a single
//! `u32` bit-packed word transmitted big-endian. There is no magic number
//! and no version byte: the wire format is simple enough that framing and
//! message versioning are not this codec's concern.

use crate::error::{ProtocolError, Result};

/// Size of the serialized header in bytes.
pub const HEADER_LEN: usize = 4;

/// Largest representable payload length: `2^28 - 1`.
pub const MAX_LEN: u32 = 0x0FFF_FFFF;

/// Number of bits reserved for the opcode (top nibble of the word).
const TYPE_SHIFT: u32 = 28;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Opcode namespace, 0..=15.
    pub opcode: u8,
    /// Payload length in bytes, 0..=`MAX_LEN`.
    pub len: u32,
}

impl Header {
    /// Construct a header, rejecting a length that would not fit in 28 bits.
    pub fn new(opcode: u8, len: u32) -> Result<Self> {
        if len > MAX_LEN {
            return Err(ProtocolError::FrameTooLarge { len: u64::from(len), max: MAX_LEN });
        }
        Ok(Self { opcode, len })
    }

    /// Pack into the 4-byte big-endian wire representation.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let raw = (u32::from(self.opcode) << TYPE_SHIFT) | (self.len & MAX_LEN);
        raw.to_be_bytes()
    }

    /// Unpack from the 4-byte big-endian wire representation.
    ///
    /// Decoding a packed word can never produce a length outside `0..=MAX_LEN`
    /// (the mask guarantees it), so this never fails; it exists as a
    /// reciprocal of [`Header::encode`] and to name the operation at call
    /// sites.
    #[must_use]
    pub fn decode(bytes: [u8; HEADER_LEN]) -> Self {
        let raw = u32::from_be_bytes(bytes);
        let opcode = (raw >> TYPE_SHIFT) as u8;
        let len = raw & MAX_LEN;
        Self { opcode, len }
    }
}
