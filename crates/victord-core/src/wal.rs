//! Write-ahead log engine: append-only file of applied mutation frames,
//! replayed verbatim at startup, truncated at checkpoint.
//!
//! The WAL stores raw frame bytes with no envelope: no checksum, no
//! timestamp, no sequence number. Replay re-dispatches each frame through
//! the same handler used for live traffic (with recording disabled), so a
//! format change to any request payload is, by construction, also a WAL
//! format change. That tradeoff is accepted here in exchange for a trivially
//! simple log format.

use std::{
    fs::{File, OpenOptions},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use victord_proto::{Frame, ProtocolError};

use crate::error::WalError;

/// An open append-mode handle onto one WAL file.
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    file: File,
}

impl Wal {
    /// Open (creating if absent) the WAL file at `path` in append mode.
    ///
    /// # Errors
    ///
    /// [`WalError::Io`] on any filesystem failure.
    pub fn open_append(path: &Path) -> Result<Self, WalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { path: path.to_path_buf(), file })
    }

    /// Append one applied frame, flushing to the OS before returning.
    ///
    /// A failure here is logged by the caller and does not roll back the
    /// mutation that already landed in the collaborator's in-memory state.
    /// This method only reports the failure: it never panics or aborts.
    ///
    /// # Errors
    ///
    /// [`WalError::Append`] if the write or flush fails.
    pub fn append(&mut self, frame: &Frame) -> Result<(), WalError> {
        frame.write(&mut self.file).map_err(|err| WalError::Append(err.to_string()))?;
        self.file.flush().map_err(|err| WalError::Append(err.to_string()))?;
        Ok(())
    }

    /// Remove the WAL file on disk after a successful checkpoint.
    ///
    /// # Errors
    ///
    /// [`WalError::Io`] if the file cannot be removed.
    pub fn truncate(&self) -> Result<(), WalError> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}

/// Replay every frame in the WAL at `path` through `apply`, in order.
///
/// A missing WAL file is not an error: a fresh database has none. A clean
/// EOF exactly at a frame boundary ends replay successfully; a short or
/// malformed trailing frame is a [`WalError::Replay`].
///
/// # Errors
///
/// [`WalError::Replay`] if a frame is truncated or fails to decode;
/// whatever `apply` returns, propagated unchanged.
pub fn replay(path: &Path, mut apply: impl FnMut(Frame) -> Result<(), WalError>) -> Result<(), WalError> {
    if !path.exists() {
        return Ok(());
    }
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    loop {
        match Frame::read(&mut reader) {
            Ok(frame) => apply(frame)?,
            Err(ProtocolError::ShortRead { actual: 0, .. }) => break,
            Err(err) => return Err(WalError::Replay(err.to_string())),
        }
    }
    Ok(())
}

/// Tracks mutation counts since the last checkpoint and the threshold at
/// which the next one should be attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointCounter {
    adds: u64,
    dels: u64,
    threshold: u64,
}

impl CheckpointCounter {
    /// Build a fresh, zeroed counter for the given threshold.
    #[must_use]
    pub fn new(threshold: u64) -> Self {
        Self { adds: 0, dels: 0, threshold }
    }

    /// Record one successful insert/put.
    pub fn record_add(&mut self) {
        self.adds += 1;
    }

    /// Record one successful delete.
    pub fn record_del(&mut self) {
        self.dels += 1;
    }

    /// `op_add_counter + op_del_counter > threshold`, exactly as specified.
    #[must_use]
    pub fn should_checkpoint(&self) -> bool {
        self.adds + self.dels > self.threshold
    }

    /// Zero both counters after a successful checkpoint.
    pub fn reset(&mut self) {
        self.adds = 0;
        self.dels = 0;
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use victord_proto::{Message, opcode};

    use super::*;

    #[test]
    fn append_then_replay_reapplies_every_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.twal");

        {
            let mut wal = Wal::open_append(&path).unwrap();
            for i in 0..3u64 {
                let message = Message::Put { key: i.to_le_bytes().to_vec(), value: b"v".to_vec() };
                let frame = Frame::new(message.opcode(), message.encode().unwrap()).unwrap();
                wal.append(&frame).unwrap();
            }
        }

        let mut replayed = Vec::new();
        replay(&path, |frame| {
            replayed.push(frame.header.opcode);
            Ok(())
        })
        .unwrap();

        assert_eq!(replayed, vec![opcode::PUT, opcode::PUT, opcode::PUT]);
    }

    #[test]
    fn replay_of_missing_file_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.twal");
        let mut calls = 0;
        replay(&path, |_| {
            calls += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn truncated_trailing_frame_fails_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.twal");
        std::fs::write(&path, [0u8, 0, 0, 1]).unwrap(); // header claims 1-byte payload, none follows
        let result = replay(&path, |_| Ok(()));
        assert!(matches!(result, Err(WalError::Replay(_))));
    }

    #[test]
    fn checkpoint_counter_fires_past_threshold() {
        let mut counter = CheckpointCounter::new(3);
        for _ in 0..3 {
            counter.record_add();
        }
        assert!(!counter.should_checkpoint());
        counter.record_del();
        assert!(counter.should_checkpoint());
        counter.reset();
        assert!(!counter.should_checkpoint());
    }
}
