//! Shared harness for spinning up an index server against a temporary
//! database directory and talking to it through [`victord_client`].

use std::{path::PathBuf, thread, time::Duration};

use tempfile::TempDir;
use victord_client::Client;
use victord_core::{Reactor, Terminator, index::SimilarityMethod};
use victord_index_server::state::IndexState;

/// A running index server plus the resources needed to stop it and inspect
/// its on-disk files afterward.
pub struct Harness {
    pub dir: TempDir,
    pub socket: PathBuf,
    terminator: Terminator,
    handle: Option<thread::JoinHandle<()>>,
}

impl Harness {
    /// Start a fresh server (or resume one) over `dir`, with the given
    /// dimensionality and checkpoint threshold.
    pub fn start(dir: TempDir, dims: usize, export_threshold: u64) -> Self {
        let snapshot = dir.path().join("db.index");
        let wal = dir.path().join("db.iwal");
        let socket = dir.path().join("socket.unix");

        let state = IndexState::open(dims, SimilarityMethod::Cosine, snapshot, &wal, export_threshold)
            .expect("state opens");
        let terminator = Terminator::for_testing();
        let mut reactor =
            Reactor::bind(&socket, 128, state, terminator.clone()).expect("reactor binds");

        let handle = thread::spawn(move || {
            reactor.run().expect("reactor runs");
        });

        // Give the listener a moment to come up before the first connect.
        thread::sleep(Duration::from_millis(20));

        Self { dir, socket, terminator, handle: Some(handle) }
    }

    /// Connect a fresh client to this server.
    pub fn client(&self) -> Client {
        Client::connect(&self.socket).expect("client connects")
    }

    /// Stop the reactor and wait for its thread to exit, consuming the
    /// temp directory so the caller can reopen it for a restart scenario.
    pub fn shutdown(mut self) -> TempDir {
        self.terminator.flag().store(true, std::sync::atomic::Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().expect("reactor thread does not panic");
        }
        self.dir
    }

    /// Drop the harness without a clean shutdown, simulating a crash: the
    /// reactor thread is left running and detached, the socket and any
    /// open connections are abandoned, and only the on-disk files survive.
    pub fn crash(self) -> TempDir {
        self.dir
    }
}
