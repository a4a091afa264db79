//! Protocol-level errors: framing, CBOR, and message-shape violations.

use thiserror::Error;

/// Errors raised while encoding or decoding frames and messages.
///
/// These are all protocol violations: malformed input that the peer sent,
/// not operational failures of the collaborator state machines (those are
/// [`crate::message::OpResult`] codes carried inside a successfully-decoded
/// message).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Header declared a payload length above `2^28 - 1`.
    #[error("frame length {len} exceeds maximum {max}")]
    FrameTooLarge {
        /// The length that was rejected.
        len: u64,
        /// The wire maximum (`0x0FFF_FFFF`).
        max: u32,
    },

    /// The peer closed the connection or the underlying stream errored
    /// before a complete frame (header or payload) could be read.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes the frame claimed.
        expected: usize,
        /// Bytes actually available before EOF/error.
        actual: usize,
    },

    /// Opcode did not name a message kind this codec understands.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    /// The payload was not well-formed CBOR.
    #[error("malformed CBOR payload: {0}")]
    Cbor(String),

    /// The payload decoded as CBOR but was not the definite-length array the
    /// opcode requires, or had the wrong number of elements.
    #[error("wrong message arity for opcode {opcode:#04x}: expected {expected}, got {actual}")]
    WrongArity {
        /// Opcode being decoded.
        opcode: u8,
        /// Arity the opcode's payload shape requires.
        expected: usize,
        /// Arity actually present.
        actual: usize,
    },

    /// A fixed array slot held a CBOR type other than the one the field
    /// requires (e.g. a text string where a byte string was required).
    #[error("wrong CBOR type for field `{field}`")]
    WrongType {
        /// Name of the offending field, for diagnostics.
        field: &'static str,
    },

    /// An integer field did not fit the target width or was negative.
    #[error("integer out of range for field `{field}`")]
    IntegerOutOfRange {
        /// Name of the offending field, for diagnostics.
        field: &'static str,
    },

    /// Underlying I/O failure while reading or writing a frame.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Convenience alias for protocol-layer results.
pub type Result<T> = std::result::Result<T, ProtocolError>;
