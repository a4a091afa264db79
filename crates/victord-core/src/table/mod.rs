//! Key-value collaborator: `alloc/load/dump/put/get/del/size`.
//!
//! [`memstore`] supplies the one concrete, in-process implementation this
//! workspace ships. `destroy()` from the collaborator interface has no
//! counterpart here: a Rust value's `Drop` impl plays that role.

pub mod memstore;

use std::path::Path;

pub use memstore::MemTable;

use crate::error::TableError;

/// The opaque key-value collaborator interface.
pub trait KeyValueStore: Send {
    /// Insert or overwrite `key` with `value`. Unlike the vector index,
    /// `PUT` is an upsert: there is no duplicate-key error.
    fn put(&mut self, key: &[u8], value: &[u8]);

    /// Look up `key`.
    ///
    /// # Errors
    ///
    /// [`TableError::KeyNotFound`] if the key is absent.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, TableError>;

    /// Remove `key`.
    ///
    /// # Errors
    ///
    /// [`TableError::KeyNotFound`] if the key is absent.
    fn del(&mut self, key: &[u8]) -> Result<(), TableError>;

    /// Number of keys currently stored.
    fn size(&self) -> u64;

    /// Write the full committed state to `path` (checkpoint export).
    ///
    /// # Errors
    ///
    /// [`TableError::System`] on I/O or serialization failure.
    fn dump(&self, path: &Path) -> Result<(), TableError>;
}
