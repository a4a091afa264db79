//! Table server state machine: the one place that knows what PUT, GET, and
//! DEL mean.

use std::path::PathBuf;

use victord_core::{
    reactor::{DispatchOutcome, Dispatcher},
    table::{KeyValueStore, MemTable},
    wal::{self, CheckpointCounter, Wal},
};
use victord_proto::{Frame, Message, OpResult, opcode::result_code};

/// Owns the key-value collaborator, its WAL, and its checkpoint bookkeeping.
pub struct TableState {
    table: MemTable,
    wal: Wal,
    counter: CheckpointCounter,
    snapshot_path: PathBuf,
}

impl TableState {
    /// Build state for a fresh or existing database: load the snapshot if
    /// one exists, allocate an empty table otherwise, then replay the WAL
    /// on top of it.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure from loading the snapshot or WAL.
    pub fn open(
        snapshot_path: PathBuf,
        wal_path: &std::path::Path,
        export_threshold: u64,
    ) -> Result<Self, victord_core::error::WalError> {
        let mut table = if snapshot_path.exists() {
            MemTable::load(&snapshot_path).map_err(|err| victord_core::error::WalError::Io(err.to_string()))?
        } else {
            MemTable::alloc()
        };

        wal::replay(wal_path, |frame| apply_replayed(&mut table, &frame))?;

        let wal = Wal::open_append(wal_path)?;
        Ok(Self { table, wal, counter: CheckpointCounter::new(export_threshold), snapshot_path })
    }

    fn maybe_checkpoint(&mut self) {
        if !self.counter.should_checkpoint() {
            return;
        }
        match self.table.dump(&self.snapshot_path) {
            Ok(()) => match self.wal.truncate() {
                Ok(()) => self.counter.reset(),
                Err(err) => tracing::error!(error = %err, "checkpoint snapshot written but WAL truncation failed"),
            },
            Err(err) => tracing::error!(error = %err, "checkpoint export failed, WAL left intact"),
        }
    }
}

fn apply_replayed(table: &mut MemTable, frame: &Frame) -> Result<(), victord_core::error::WalError> {
    let decode_err = |err: victord_proto::ProtocolError| victord_core::error::WalError::Replay(err.to_string());
    match frame.header.opcode {
        victord_proto::opcode::PUT => {
            let Message::Put { key, value } =
                Message::decode(frame.header.opcode, &frame.payload).map_err(decode_err)?
            else {
                return Err(victord_core::error::WalError::Replay(
                    "PUT opcode decoded to an unexpected message".to_string(),
                ));
            };
            table.put(&key, &value);
            Ok(())
        },
        victord_proto::opcode::DEL => {
            let Message::Del { key } =
                Message::decode(frame.header.opcode, &frame.payload).map_err(decode_err)?
            else {
                return Err(victord_core::error::WalError::Replay(
                    "DEL opcode decoded to an unexpected message".to_string(),
                ));
            };
            match table.del(&key) {
                Ok(()) | Err(victord_core::error::TableError::KeyNotFound) => Ok(()),
                Err(err) => Err(victord_core::error::WalError::Replay(err.to_string())),
            }
        },
        other => {
            tracing::warn!(opcode = other, "skipping WAL entry with unexpected opcode during table replay");
            Ok(())
        },
    }
}

impl Dispatcher for TableState {
    fn dispatch(&mut self, opcode: u8, payload: &[u8]) -> DispatchOutcome {
        let message = match Message::decode(opcode, payload) {
            Ok(message) => message,
            Err(err) => return protocol_error(&err.to_string()),
        };

        match message {
            Message::Put { key, value } => self.handle_put(opcode, payload, &key, &value),
            Message::Get { key } => self.handle_get(&key),
            Message::Del { key } => self.handle_del(opcode, payload, &key),
            _ => protocol_error("opcode is not valid for the table server"),
        }
    }

    fn after_iteration(&mut self) {
        self.maybe_checkpoint();
    }
}

impl TableState {
    fn handle_put(&mut self, opcode: u8, payload: &[u8], key: &[u8], value: &[u8]) -> DispatchOutcome {
        self.table.put(key, value);
        if let Ok(frame) = Frame::new(opcode, payload.to_vec()) {
            if let Err(err) = self.wal.append(&frame) {
                tracing::warn!(error = %err, "WAL append failed after successful put");
            }
        }
        self.counter.record_add();
        respond(Message::PutResult(OpResult::ok()))
    }

    fn handle_get(&self, key: &[u8]) -> DispatchOutcome {
        match self.table.get(key) {
            Ok(value) => respond(Message::GetResult { value }),
            Err(_) => respond(Message::Error(OpResult::err(result_code::NOT_FOUND, "key not found"))),
        }
    }

    fn handle_del(&mut self, opcode: u8, payload: &[u8], key: &[u8]) -> DispatchOutcome {
        match self.table.del(key) {
            Ok(()) => {
                if let Ok(frame) = Frame::new(opcode, payload.to_vec()) {
                    if let Err(err) = self.wal.append(&frame) {
                        tracing::warn!(error = %err, "WAL append failed after successful delete");
                    }
                }
                self.counter.record_del();
                respond(Message::DelResult(OpResult::ok()))
            },
            Err(_) => respond(Message::DelResult(OpResult::err(result_code::NOT_FOUND, "key not found"))),
        }
    }
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
