//! Reactor contract and the epoll-backed I/O service.
//!
//! The [`Reactor`] trait is everything a [`TcpClient`](crate::net::TcpClient)
//! needs from an event loop:
//! - tracking a descriptor for remote disconnection,
//! - one-shot asynchronous reads,
//! - one-shot asynchronous writes.
//!
//! Completions are delivered through boxed callbacks on reactor-owned
//! threads. [`IoService`] is the bundled implementation; tests and
//! embedders may provide their own.

mod command;
mod core;
mod event;
mod io;
pub(crate) mod poller;
mod service;

pub use service::{IoService, IoServiceBuilder};

use bytes::{Bytes, BytesMut};

use std::os::fd::{OwnedFd, RawFd};

/// Invoked once when the reactor detects that a tracked descriptor was
/// closed by the peer or entered an error state.
pub type DisconnectCallback = Box<dyn FnOnce() + Send>;

/// Invoked when an asynchronous read completes.
///
/// Receives the lent buffer back together with the number of bytes that were
/// appended to it.
pub type ReadCallback = Box<dyn FnOnce(BytesMut, usize) + Send>;

/// Invoked when an asynchronous write completes with the number of bytes
/// actually written, which may be fewer than requested.
pub type WriteCallback = Box<dyn FnOnce(usize) + Send>;

/// An I/O multiplexer driving non-blocking descriptors.
///
/// Implementations must never invoke a callback from inside the method that
/// received it: completions always run later, on a context owned by the
/// reactor. Callers rely on this to issue operations while holding locks.
///
/// I/O failures are reported through the [`DisconnectCallback`] registered by
/// [`track`](Self::track). Pending read and write callbacks for a descriptor
/// that failed, or that was untracked, are dropped without being invoked.
pub trait Reactor: Send + Sync {
    /// Starts watching `fd` for readiness and remote closure.
    fn track(&self, fd: RawFd, on_remote_disconnect: DisconnectCallback);

    /// Stops watching `socket`, discards its pending operations and closes
    /// it.
    ///
    /// The descriptor must stay open until no pending operation can reach
    /// it anymore, so its number is not reused underneath an operation
    /// issued for the previous connection.
    fn untrack(&self, socket: OwnedFd);

    /// Reads at most `max_len` bytes from `fd`, appending them to `buffer`.
    fn async_read(&self, fd: RawFd, buffer: BytesMut, max_len: usize, on_complete: ReadCallback);

    /// Writes as much of `buffer` to `fd` as the socket accepts in one go.
    fn async_write(&self, fd: RawFd, buffer: Bytes, on_complete: WriteCallback);
}
