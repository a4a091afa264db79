//! Single-threaded, cooperative connection multiplexer.
//!
//! One `mio` readiness loop drives the listen endpoint and a dense table of
//! up to `max_connections` client slots. No worker threads, no async
//! runtime, no locking primitives: everything here is owned by the one task
//! that calls [`Reactor::run`].
//!
//! Accepted connections are served with ordinary blocking reads and writes;
//! `mio` is used purely to learn *when* a slot is readable, not to drive
//! non-blocking I/O on it. A freshly accepted `mio::net::UnixStream` is
//! already non-blocking, so we duplicate its file descriptor into a
//! `std::os::unix::net::UnixStream`, flip that duplicate back to blocking
//! mode, and register the original descriptor with `Poll` via
//! [`mio::unix::SourceFd`] purely for readiness notification. That keeps
//! the per-connection code a plain `read_exact`/`write_all` pair, with
//! reading and writing a request as the only suspension points in the loop.

use std::{
    io::{self, Read, Write},
    os::fd::{AsFd, AsRawFd, RawFd},
    path::{Path, PathBuf},
    time::Duration,
};

use mio::{Events, Interest, Poll, Token, net::UnixListener, unix::SourceFd};
use victord_proto::{Frame, Header, ProtocolError, header::HEADER_LEN};

use crate::{signal::Terminator, storage};

const LISTENER_TOKEN: Token = Token(0);
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// What a [`Dispatcher`] wants done with the connection after handling one
/// request frame.
pub enum DispatchOutcome {
    /// Send `frame` back and keep the connection open for the next request.
    Respond(Frame),
    /// Send `frame` back, then close the connection (a protocol error that
    /// still managed to produce an ERROR frame).
    RespondAndClose(Frame),
    /// Close the connection without sending anything.
    Close,
}

/// Maps an opcode and payload to an outcome. Implemented once per server
/// binary; everything in this module is generic over it, factoring the
/// common loop as one component parameterized by a dispatcher mapping
/// opcode to handler.
pub trait Dispatcher {
    /// Handle one fully-read request frame.
    fn dispatch(&mut self, opcode: u8, payload: &[u8]) -> DispatchOutcome;

    /// Called once per loop iteration after every ready endpoint has been
    /// serviced. The default implementation does nothing; state machines
    /// that track a checkpoint threshold override this to probe it once
    /// the ready endpoints for this iteration are all handled.
    fn after_iteration(&mut self) {}

    /// Called once, after the loop has exited and every connection has been
    /// closed, before the listen endpoint is unlinked. The default
    /// implementation does nothing.
    fn on_shutdown(&mut self) {}
}

struct Connection {
    stream: std::os::unix::net::UnixStream,
    raw_fd: RawFd,
}

/// Bounded table of accepted connections, indexed by slot.
struct ConnTable {
    slots: Vec<Option<Connection>>,
}

impl ConnTable {
    fn new(max_connections: usize) -> Self {
        let mut slots = Vec::with_capacity(max_connections);
        slots.resize_with(max_connections, || None);
        Self { slots }
    }

    fn first_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    fn is_full(&self) -> bool {
        self.first_free_slot().is_none()
    }

    fn token_for_slot(slot: usize) -> Token {
        Token(slot + 1)
    }

    fn slot_for_token(token: Token) -> usize {
        token.0 - 1
    }
}

/// The generic single-threaded reactor.
pub struct Reactor<D: Dispatcher> {
    poll: Poll,
    events: Events,
    listener: UnixListener,
    socket_path: PathBuf,
    conns: ConnTable,
    dispatcher: D,
    terminator: Terminator,
    request_buf: Vec<u8>,
}

impl<D: Dispatcher> Reactor<D> {
    /// Bind the listen endpoint at `socket_path`, unlinking a stale file
    /// left over from an earlier run first, and build a reactor ready to
    /// [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Propagates any failure to unlink the stale socket, bind, or register
    /// the listener with the poller.
    pub fn bind(
        socket_path: &Path,
        max_connections: usize,
        dispatcher: D,
        terminator: Terminator,
    ) -> io::Result<Self> {
        storage::unlink_stale_socket(socket_path)?;
        let mut listener = UnixListener::bind(socket_path)?;

        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(max_connections + 1),
            listener,
            socket_path: socket_path.to_path_buf(),
            conns: ConnTable::new(max_connections),
            dispatcher,
            terminator,
            request_buf: Vec::with_capacity(4096),
        })
    }

    /// Run the loop until the terminator's flag is set, then shut down
    /// cleanly: close every connection, invoke the dispatcher's shutdown
    /// hook, and unlink the listen endpoint.
    ///
    /// # Errors
    ///
    /// Propagates any poll failure other than `EINTR`, which is retried.
    pub fn run(&mut self) -> io::Result<()> {
        while !self.terminator.should_terminate() {
            match self.poll.poll(&mut self.events, Some(POLL_TIMEOUT)) {
                Ok(()) => {},
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }

            let tokens: Vec<Token> = self.events.iter().map(mio::event::Event::token).collect();
            for token in tokens {
                if token == LISTENER_TOKEN {
                    self.accept_ready()?;
                } else {
                    self.service_ready(token);
                }
            }

            self.dispatcher.after_iteration();
        }

        self.shutdown();
        Ok(())
    }

    fn accept_ready(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((mio_stream, _addr)) => self.accept_one(mio_stream)?,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    fn accept_one(&mut self, mio_stream: mio::net::UnixStream) -> io::Result<()> {
        let Some(slot) = self.conns.first_free_slot() else {
            tracing::warn!("connection table full, closing new client");
            drop(mio_stream);
            return Ok(());
        };

        let owned_fd = mio_stream.as_fd().try_clone_to_owned()?;
        let stream = std::os::unix::net::UnixStream::from(owned_fd);
        stream.set_nonblocking(false)?;
        let raw_fd = stream.as_raw_fd();
        drop(mio_stream);

        let token = ConnTable::token_for_slot(slot);
        self.poll.registry().register(&mut SourceFd(&raw_fd), token, Interest::READABLE)?;
        self.conns.slots[slot] = Some(Connection { stream, raw_fd });
        Ok(())
    }

    fn service_ready(&mut self, token: Token) {
        let slot = ConnTable::slot_for_token(token);
        let Some(conn) = self.conns.slots.get_mut(slot).and_then(Option::as_mut) else {
            return;
        };

        match read_request_frame(&mut conn.stream, &mut self.request_buf) {
            Ok(header) => self.handle_request(slot, header),
            Err(_) => self.close_slot(slot),
        }
    }

    fn handle_request(&mut self, slot: usize, header: Header) {
        let outcome = self.dispatcher.dispatch(header.opcode, &self.request_buf);
        let Some(conn) = self.conns.slots.get_mut(slot).and_then(Option::as_mut) else { return };

        match outcome {
            DispatchOutcome::Respond(frame) => {
                if frame.write(&mut conn.stream).is_err() {
                    self.close_slot(slot);
                }
            },
            DispatchOutcome::RespondAndClose(frame) => {
                let _ = frame.write(&mut conn.stream);
                self.close_slot(slot);
            },
            DispatchOutcome::Close => self.close_slot(slot),
        }
    }

    fn close_slot(&mut self, slot: usize) {
        if let Some(conn) = self.conns.slots[slot].take() {
            let _ = self.poll.registry().deregister(&mut SourceFd(&conn.raw_fd));
        }
    }

    fn shutdown(&mut self) {
        for slot in 0..self.conns.slots.len() {
            self.close_slot(slot);
        }
        self.dispatcher.on_shutdown();
        let _ = storage::unlink_stale_socket(&self.socket_path);
    }
}

/// Read one frame's header and payload into a caller-owned buffer, reusing
/// its allocation across calls rather than allocating fresh per request:
/// one buffer, owned by the loop.
fn read_request_frame(stream: &mut impl Read, buf: &mut Vec<u8>) -> Result<Header, ProtocolError> {
    let mut header_bytes = [0u8; HEADER_LEN];
    read_exact_or_short(stream, &mut header_bytes, 0)?;
    let header = Header::decode(header_bytes);

    buf.clear();
    buf.resize(header.len as usize, 0);
    read_exact_or_short(stream, buf, HEADER_LEN)?;

    Ok(header)
}

fn read_exact_or_short(stream: &mut impl Read, buf: &mut [u8], already_read: usize) -> Result<(), ProtocolError> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::ShortRead { expected: already_read + buf.len(), actual: already_read })
        },
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_table_slot_token_mapping_round_trips() {
        assert_eq!(ConnTable::token_for_slot(0), Token(1));
        assert_eq!(ConnTable::slot_for_token(Token(1)), 0);
        assert_eq!(ConnTable::token_for_slot(127), Token(128));
    }

    #[test]
    fn conn_table_reports_full_only_when_every_slot_taken() {
        let table = ConnTable::new(0);
        assert!(table.is_full());
        assert_eq!(table.first_free_slot(), None);
    }
}
