//! Index server state machine: the one place that knows what INSERT,
//! DELETE, and SEARCH mean.

use std::path::PathBuf;

use victord_core::{
    index::{FlatIndex, VectorIndex},
    reactor::{DispatchOutcome, Dispatcher},
    wal::{self, CheckpointCounter, Wal},
};
use victord_proto::{Frame, Message, OpResult, opcode::result_code};

/// Upper bound SEARCH's `k` is clamped to, standing in for the
/// collaborator's own supported maximum.
const MAX_SEARCH_K: u32 = 4096;

/// Owns the index collaborator, its WAL, and its checkpoint bookkeeping.
pub struct IndexState {
    index: FlatIndex,
    dims: usize,
    wal: Wal,
    counter: CheckpointCounter,
    snapshot_path: PathBuf,
}

impl IndexState {
    /// Build state for a fresh or existing database: load the snapshot if
    /// one exists, allocate an empty index otherwise, then replay the WAL
    /// on top of it.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure from loading the snapshot or WAL.
    pub fn open(
        dims: usize,
        method: victord_core::index::SimilarityMethod,
        snapshot_path: PathBuf,
        wal_path: &std::path::Path,
        export_threshold: u64,
    ) -> Result<Self, victord_core::error::WalError> {
        let mut index = if snapshot_path.exists() {
            FlatIndex::import(&snapshot_path, dims, method)
                .map_err(|err| victord_core::error::WalError::Io(err.to_string()))?
        } else {
            FlatIndex::alloc(dims, method)
        };

        wal::replay(wal_path, |frame| apply_replayed(&mut index, &frame))?;

        let wal = Wal::open_append(wal_path)?;
        Ok(Self { index, dims, wal, counter: CheckpointCounter::new(export_threshold), snapshot_path })
    }

    fn maybe_checkpoint(&mut self) {
        if !self.counter.should_checkpoint() {
            return;
        }
        match self.index.export(&self.snapshot_path) {
            Ok(()) => match self.wal.truncate() {
                Ok(()) => self.counter.reset(),
                Err(err) => tracing::error!(error = %err, "checkpoint snapshot written but WAL truncation failed"),
            },
            Err(err) => tracing::error!(error = %err, "checkpoint export failed, WAL left intact"),
        }
    }
}

/// Replay one WAL frame against `index` directly, bypassing the dispatcher
/// (and therefore the WAL itself) so replay cannot recursively re-log.
fn apply_replayed(index: &mut FlatIndex, frame: &Frame) -> Result<(), victord_core::error::WalError> {
    let decode_err = |err: victord_proto::ProtocolError| victord_core::error::WalError::Replay(err.to_string());
    match frame.header.opcode {
        victord_proto::opcode::INSERT => {
            let Message::Insert { id, vector } = Message::decode(frame.header.opcode, &frame.payload)
                .map_err(decode_err)?
            else {
                return Err(victord_core::error::WalError::Replay(
                    "INSERT opcode decoded to an unexpected message".to_string(),
                ));
            };
            match index.insert(id, &vector) {
                Ok(()) | Err(victord_core::error::IndexError::Duplicate(_)) => Ok(()),
                Err(err) => Err(victord_core::error::WalError::Replay(err.to_string())),
            }
        },
        victord_proto::opcode::DELETE => {
            let Message::Delete { id } =
                Message::decode(frame.header.opcode, &frame.payload).map_err(decode_err)?
            else {
                return Err(victord_core::error::WalError::Replay(
                    "DELETE opcode decoded to an unexpected message".to_string(),
                ));
            };
            match index.delete(id) {
                Ok(()) | Err(victord_core::error::IndexError::NotFound(_)) => Ok(()),
                Err(err) => Err(victord_core::error::WalError::Replay(err.to_string())),
            }
        },
        other => {
            tracing::warn!(opcode = other, "skipping WAL entry with unexpected opcode during index replay");
            Ok(())
        },
    }
}

impl Dispatcher for IndexState {
    fn dispatch(&mut self, opcode: u8, payload: &[u8]) -> DispatchOutcome {
        let message = match Message::decode(opcode, payload) {
            Ok(message) => message,
            Err(err) => return protocol_error(&err.to_string()),
        };

        match message {
            Message::Insert { id, vector } => self.handle_insert(opcode, payload, id, vector),
            Message::Delete { id } => self.handle_delete(opcode, payload, id),
            Message::Search { vector, k } => self.handle_search(vector, k),
            _ => protocol_error("opcode is not valid for the index server"),
        }
    }

    fn after_iteration(&mut self) {
        self.maybe_checkpoint();
    }
}

impl IndexState {
    fn handle_insert(&mut self, opcode: u8, payload: &[u8], id: u64, vector: Vec<f32>) -> DispatchOutcome {
        if vector.len() != self.dims {
            return respond(dimension_mismatch_message());
        }
        match self.index.insert(id, &vector) {
            Ok(()) => {
                self.log_and_record_add(opcode, payload);
                respond(Message::InsertResult(OpResult::ok()))
            },
            Err(victord_core::error::IndexError::Duplicate(bad_id)) => {
                respond(Message::InsertResult(OpResult::err(result_code::DUPLICATE, format!("duplicate id {bad_id}"))))
            },
            Err(victord_core::error::IndexError::InvalidDims { .. }) => respond(dimension_mismatch_message()),
            Err(err) => {
                tracing::error!(error = %err, "index insert failed");
                respond(Message::InsertResult(OpResult::err(result_code::SYSTEM, err.to_string())))
            },
        }
    }

    fn handle_delete(&mut self, opcode: u8, payload: &[u8], id: u64) -> DispatchOutcome {
        match self.index.delete(id) {
            Ok(()) => {
                self.log_and_record_del(opcode, payload);
                respond(Message::DeleteResult(OpResult::ok()))
            },
            Err(victord_core::error::IndexError::NotFound(bad_id)) => {
                respond(Message::DeleteResult(OpResult::err(result_code::NOT_FOUND, format!("id {bad_id} not found"))))
            },
            Err(err) => {
                tracing::error!(error = %err, "index delete failed");
                respond(Message::DeleteResult(OpResult::err(result_code::SYSTEM, err.to_string())))
            },
        }
    }

    fn handle_search(&self, vector: Vec<f32>, k: u32) -> DispatchOutcome {
        if vector.len() != self.dims {
            return respond(dimension_mismatch_message());
        }
        let k = k.min(MAX_SEARCH_K);
        match self.index.search(&vector, k) {
            Ok(neighbors) => respond(Message::MatchResult(
                neighbors
                    .into_iter()
                    .map(|n| victord_proto::Match { id: n.id, distance: n.distance })
                    .collect(),
            )),
            Err(err) => {
                tracing::error!(error = %err, "index search failed");
                respond(Message::Error(OpResult::err(result_code::SYSTEM, err.to_string())))
            },
        }
    }

    fn log_and_record_add(&mut self, opcode: u8, payload: &[u8]) {
        if let Ok(frame) = Frame::new(opcode, payload.to_vec()) {
            if let Err(err) = self.wal.append(&frame) {
                tracing::warn!(error = %err, "WAL append failed after successful insert");
            }
        }
        self.counter.record_add();
    }

    fn log_and_record_del(&mut self, opcode: u8, payload: &[u8]) {
        if let Ok(frame) = Frame::new(opcode, payload.to_vec()) {
            if let Err(err) = self.wal.append(&frame) {
                tracing::warn!(error = %err, "WAL append failed after successful delete");
            }
        }
        self.counter.record_del();
    }
}

fn dimension_mismatch_message() -> Message {
    Message::Error(OpResult::err(result_code::INVALID_DIMS, "vector length does not match index dimensionality"))
}

fn respond(message: Message) -> DispatchOutcome {
    let payload = message.encode().unwrap_or_default();
    match Frame::new(message.opcode(), payload) {
        Ok(frame) => DispatchOutcome::Respond(frame),
        Err(_) => DispatchOutcome::Close,
    }
}

fn protocol_error(detail: &str) -> DispatchOutcome {
    let message = Message::Error(OpResult::err(result_code::PROTOCOL, detail.to_string()));
    let payload = message.encode().unwrap_or_default();
    match Frame::new(message.opcode(), payload) {
        Ok(frame) => DispatchOutcome::RespondAndClose(frame),
        Err(_) => DispatchOutcome::Close,
    }
}
