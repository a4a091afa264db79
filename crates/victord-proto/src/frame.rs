//! Frame type and blocking wire I/O.
//!
//! A `Frame` pairs a decoded [`Header`] with its still-encoded CBOR payload.
//! Reading and writing a frame is exactly two fixed-size-then-declared-size
//! operations: a 4-byte header, then `header.len` bytes of payload. Both
//! server state machines and [`crate::message::Message`] sit on top of this;
//! nothing above this layer ever touches a socket directly.

use std::io::{Read, Write};

use bytes::Bytes;

use crate::{
    error::{ProtocolError, Result},
    header::{HEADER_LEN, Header},
};

/// A header paired with its raw (still CBOR-encoded) payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header: opcode and payload length.
    pub header: Header,
    /// Payload bytes, exactly `header.len` long.
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame from an opcode and already-encoded payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLarge`] if `payload` does not fit in
    /// the header's 28-bit length field.
    pub fn new(opcode: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let len = u32::try_from(payload.len())
            .map_err(|_| ProtocolError::FrameTooLarge { len: payload.len() as u64, max: crate::header::MAX_LEN })?;
        let header = Header::new(opcode, len)?;
        Ok(Self { header, payload })
    }

    /// Read one frame from a blocking, readiness-gated stream.
    ///
    /// The caller is expected to only invoke this once the mio readiness
    /// event for `reader` has fired; the reads themselves are ordinary
    /// blocking `read_exact` calls, matching the "blocking receive-exactly-N"
    /// language of the framing contract. A clean EOF exactly at the header
    /// boundary is reported as [`ProtocolError::ShortRead`] with `actual: 0`
    /// so callers can distinguish "peer hung up between frames" (expected,
    /// log at debug) from a frame truncated mid-payload (a real protocol
    /// violation).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortRead`] on EOF before a complete frame,
    /// [`ProtocolError::Io`] on any other I/O failure.
    pub fn read(reader: &mut impl Read) -> Result<Self> {
        let mut header_bytes = [0u8; HEADER_LEN];
        read_exact_or_short(reader, &mut header_bytes, 0)?;
        let header = Header::decode(header_bytes);

        let mut payload = vec![0u8; header.len as usize];
        read_exact_or_short(reader, &mut payload, HEADER_LEN)?;

        Ok(Self { header, payload: Bytes::from(payload) })
    }

    /// Write this frame to a blocking, readiness-gated stream.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] if the underlying write fails.
    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.header.encode())?;
        writer.write_all(&self.payload)?;
        Ok(())
    }
}

/// `read_exact`, translating `UnexpectedEof` into a [`ProtocolError::ShortRead`]
/// instead of letting it surface as an opaque `Io` error.
fn read_exact_or_short(reader: &mut impl Read, buf: &mut [u8], already_read: usize) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::ShortRead { expected: already_read + buf.len(), actual: already_read })
        },
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn frame_round_trip(opcode in 0u8..16, payload in prop::collection::vec(any::<u8>(), 0..256)) {
            let frame = Frame::new(opcode, payload).expect("fits in header length");
            let mut wire = Vec::new();
            frame.write(&mut wire).expect("writes");

            let mut cursor = Cursor::new(wire);
            let parsed = Frame::read(&mut cursor).expect("reads");
            prop_assert_eq!(frame, parsed);
        }
    }

    #[test]
    fn clean_eof_before_header_is_short_read_at_zero() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let result = Frame::read(&mut cursor);
        assert!(matches!(result, Err(ProtocolError::ShortRead { actual: 0, .. })));
    }

    #[test]
    fn truncated_payload_is_short_read() {
        let frame = Frame::new(0x01, vec![1, 2, 3, 4]).expect("fits");
        let mut wire = Vec::new();
        frame.write(&mut wire).expect("writes");
        wire.truncate(wire.len() - 1);

        let mut cursor = Cursor::new(wire);
        let result = Frame::read(&mut cursor);
        assert!(matches!(result, Err(ProtocolError::ShortRead { .. })));
    }
}
