//! Durability engine, storage layout, connection multiplexer, and
//! collaborator traits shared by the `victord` index and table servers.
//!
//! Layered bottom to top:
//! - [`config`] / [`storage`]: environment-driven settings and the
//!   `<root>/<name>/` directory layout.
//! - [`index`] / [`table`]: the opaque vector-index and key-value
//!   collaborator traits, each with one concrete in-process implementation.
//! - [`wal`]: append, replay, and checkpoint-threshold tracking.
//! - [`signal`]: the process-wide terminate flag.
//! - [`reactor`]: the single-threaded `mio`-based connection multiplexer
//!   that ties the rest together, generic over a [`reactor::Dispatcher`]
//!   each server binary implements for its own opcode set.

pub mod config;
pub mod error;
pub mod index;
pub mod reactor;
pub mod signal;
pub mod storage;
pub mod table;
pub mod wal;

pub use config::EnvConfig;
pub use error::{IndexError, TableError, WalError};
pub use reactor::{DispatchOutcome, Dispatcher, Reactor};
pub use signal::Terminator;
pub use storage::Layout;
pub use wal::{CheckpointCounter, Wal};
