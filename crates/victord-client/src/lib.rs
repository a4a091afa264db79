//! Blocking Unix-domain-socket client for the `victord` servers.
//!
//! A thin transport layer over [`victord_proto`]: it sends and receives
//! frames over a connected stream and does nothing else. All protocol
//! semantics (what INSERT means, what a NOT_FOUND code means) live in the
//! servers; this crate exists so the integration test suites for both
//! servers, and any other operator tooling, have one shared way to talk to
//! them.

use std::{
    os::unix::net::UnixStream,
    path::Path,
};

use thiserror::Error;
use victord_proto::{Frame, Message, OpResult};

/// Errors raised while talking to a server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting to, reading from, or writing to the socket failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    /// The response could not be decoded as a protocol message.
    #[error("protocol error: {0}")]
    Protocol(#[from] victord_proto::ProtocolError),
    /// The server responded with an `ERROR` frame.
    #[error("server returned error {code}: {message}")]
    Server {
        /// Result code the server reported.
        code: u32,
        /// Human-readable detail from the server.
        message: String,
    },
    /// The response was a well-formed message, but not the kind expected
    /// for the request that was sent.
    #[error("unexpected response message")]
    UnexpectedResponse,
}

/// A connected client session.
pub struct Client {
    stream: UnixStream,
}

impl Client {
    /// Connect to a server listening at `path`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] if the connection cannot be established.
    pub fn connect(path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path)?;
        Ok(Self { stream })
    }

    /// Send `message` and return the server's response, decoded.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] on a write/read failure,
    /// [`ClientError::Protocol`] if the response does not decode.
    pub fn request(&mut self, message: &Message) -> Result<Message, ClientError> {
        let payload = message.encode()?;
        let frame = Frame::new(message.opcode(), payload)?;
        frame.write(&mut self.stream)?;

        let response = Frame::read(&mut self.stream)?;
        let decoded = Message::decode(response.header.opcode, &response.payload)?;
        Ok(decoded)
    }

    /// INSERT `(id, vector)` against the index server.
    ///
    /// # Errors
    ///
    /// [`ClientError::Server`] if the server returns a non-zero code or an
    /// `ERROR` frame; transport/protocol errors as in [`Client::request`].
    pub fn insert(&mut self, id: u64, vector: Vec<f32>) -> Result<(), ClientError> {
        match self.request(&Message::Insert { id, vector })? {
            Message::InsertResult(result) | Message::Error(result) => as_unit_result(result),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// DELETE `(id)` against the index server.
    ///
    /// # Errors
    ///
    /// See [`Client::insert`].
    pub fn delete(&mut self, id: u64) -> Result<(), ClientError> {
        match self.request(&Message::Delete { id })? {
            Message::DeleteResult(result) | Message::Error(result) => as_unit_result(result),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// SEARCH `(vector, k)` against the index server.
    ///
    /// # Errors
    ///
    /// See [`Client::insert`].
    pub fn search(&mut self, vector: Vec<f32>, k: u32) -> Result<Vec<victord_proto::Match>, ClientError> {
        match self.request(&Message::Search { vector, k })? {
            Message::MatchResult(matches) => Ok(matches),
            Message::Error(result) => Err(server_error(result)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// PUT `(key, value)` against the table server.
    ///
    /// # Errors
    ///
    /// See [`Client::insert`].
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), ClientError> {
        match self.request(&Message::Put { key, value })? {
            Message::PutResult(result) | Message::Error(result) => as_unit_result(result),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// GET `(key)` against the table server.
    ///
    /// # Errors
    ///
    /// See [`Client::insert`].
    pub fn get(&mut self, key: Vec<u8>) -> Result<Vec<u8>, ClientError> {
        match self.request(&Message::Get { key })? {
            Message::GetResult { value } => Ok(value),
            Message::Error(result) => Err(server_error(result)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// DEL `(key)` against the table server.
    ///
    /// # Errors
    ///
    /// See [`Client::insert`].
    pub fn del(&mut self, key: Vec<u8>) -> Result<(), ClientError> {
        match self.request(&Message::Del { key })? {
            Message::DelResult(result) | Message::Error(result) => as_unit_result(result),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

fn as_unit_result(result: OpResult) -> Result<(), ClientError> {
    if result.is_ok() { Ok(()) } else { Err(server_error(result)) }
}

fn server_error(result: OpResult) -> ClientError {
    ClientError::Server { code: result.code, message: result.message }
}
