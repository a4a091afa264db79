//! Error taxonomies for the durability engine and the collaborator traits.

use thiserror::Error;

/// Errors raised by the WAL engine (append, replay, checkpoint).
#[derive(Debug, Error)]
pub enum WalError {
    /// Appending the applied frame to the log file failed.
    ///
    /// A WAL write failure does not roll back the mutation that already
    /// landed in the collaborator's in-memory state; callers log this at
    /// `warn` and keep serving.
    #[error("WAL append failed: {0}")]
    Append(String),

    /// Replay hit a frame that was truncated or failed to parse.
    #[error("WAL replay failed: {0}")]
    Replay(String),

    /// The collaborator's checkpoint (snapshot export) failed.
    ///
    /// The WAL is left intact and serving continues.
    #[error("checkpoint failed: {0}")]
    Checkpoint(String),

    /// Underlying filesystem failure opening, removing, or renaming a file.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for WalError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors raised by [`crate::index::VectorIndex`] implementations.
///
/// Named directly after the result codes reported to clients for each case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    /// `insert` called with an id already present.
    #[error("duplicate id {0}")]
    Duplicate(u64),
    /// `delete`/lookup referenced an id that does not exist.
    #[error("id {0} not found")]
    NotFound(u64),
    /// A vector's length did not equal the index's configured dimensionality.
    #[error("expected {expected} dimensions, got {actual}")]
    InvalidDims {
        /// Dimensionality the index was configured with.
        expected: usize,
        /// Length of the vector that was rejected.
        actual: usize,
    },
    /// I/O or allocation failure internal to the collaborator.
    #[error("system error: {0}")]
    System(String),
}

/// Errors raised by [`crate::table::KeyValueStore`] implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    /// `get`/`del` referenced a key that does not exist.
    #[error("key not found")]
    KeyNotFound,
    /// I/O or allocation failure internal to the collaborator.
    #[error("system error: {0}")]
    System(String),
}
