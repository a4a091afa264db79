//! Wire framing and CBOR message taxonomy shared by the `victord` servers.
//!
//! Three layers, bottom to top:
//! - [`header`]: the 4-byte opcode/length word.
//! - [`frame`]: header plus raw payload bytes, and blocking read/write of
//!   that pair over a stream.
//! - [`message`]: the CBOR-encoded [`message::Message`] taxonomy carried as
//!   a frame's payload.
//!
//! Neither server crate talks to a socket except through [`Frame::read`] and
//! [`Frame::write`], and neither decodes CBOR except through [`Message`].

pub mod error;
pub mod frame;
pub mod header;
pub mod message;
pub mod opcode;

pub use error::{ProtocolError, Result};
pub use frame::Frame;
pub use header::Header;
pub use message::{Match, Message, OpResult};
