use super::poller::common::Interest;
use super::poller::platform::{sys_read, sys_send};
use super::{DisconnectCallback, ReadCallback, WriteCallback};

use bytes::{Bytes, BytesMut};

use std::io;
use std::os::fd::RawFd;

/// A descriptor tracked by the event loop.
///
/// Holds at most one pending read and one pending write, plus the callback
/// fired if the descriptor is lost.
pub(crate) struct Registration {
    /// The tracked file descriptor. Owned by the client, never closed here.
    pub(crate) fd: RawFd,

    /// Fired once on remote closure or socket error.
    pub(crate) on_disconnect: DisconnectCallback,

    pub(crate) read: Option<PendingRead>,
    pub(crate) write: Option<PendingWrite>,

    /// Interest currently installed in the poller.
    pub(crate) interest: Interest,
}

/// A read waiting for the descriptor to become readable.
pub(crate) struct PendingRead {
    pub(crate) buffer: BytesMut,
    pub(crate) max_len: usize,
    pub(crate) on_complete: ReadCallback,
}

/// A write waiting for the descriptor to become writable.
pub(crate) struct PendingWrite {
    pub(crate) buffer: Bytes,
    pub(crate) on_complete: WriteCallback,
}

/// Result of attempting a pending operation.
pub(crate) enum Attempt<T> {
    /// The operation transferred the given number of bytes.
    Done(T, usize),

    /// The socket is not ready yet; keep the operation pending.
    Blocked(T),

    /// The peer is gone or the socket failed.
    Lost(io::Error),
}

impl Registration {
    pub(crate) fn new(fd: RawFd, on_disconnect: DisconnectCallback) -> Self {
        Self {
            fd,
            on_disconnect,
            read: None,
            write: None,
            interest: Interest::default(),
        }
    }

    /// Interest implied by the pending operations.
    pub(crate) fn wanted_interest(&self) -> Interest {
        Interest {
            read: self.read.is_some(),
            write: self.write.is_some(),
        }
    }
}

impl PendingRead {
    /// Performs one `read(2)` of up to `max_len` bytes.
    ///
    /// End of stream is reported as [`Attempt::Lost`].
    pub(crate) fn attempt(mut self, fd: RawFd) -> Attempt<Self> {
        if self.max_len == 0 {
            return Attempt::Done(self, 0);
        }

        let start = self.buffer.len();
        self.buffer.resize(start + self.max_len, 0);

        loop {
            let n = sys_read(fd, &mut self.buffer[start..]);

            match n {
                (1..) => {
                    let n = n as usize;
                    self.buffer.truncate(start + n);
                    return Attempt::Done(self, n);
                }
                0 => {
                    return Attempt::Lost(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed by peer",
                    ));
                }
                _ => {
                    let err = io::Error::last_os_error();

                    match err.kind() {
                        io::ErrorKind::Interrupted => continue,
                        io::ErrorKind::WouldBlock => {
                            self.buffer.truncate(start);
                            return Attempt::Blocked(self);
                        }
                        _ => return Attempt::Lost(err),
                    }
                }
            }
        }
    }
}

impl PendingWrite {
    /// Performs one `send(2)` of the whole buffer, accepting a short write.
    pub(crate) fn attempt(self, fd: RawFd) -> Attempt<Self> {
        if self.buffer.is_empty() {
            return Attempt::Done(self, 0);
        }

        loop {
            let n = sys_send(fd, &self.buffer);

            if n >= 0 {
                return Attempt::Done(self, n as usize);
            }

            let err = io::Error::last_os_error();

            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => return Attempt::Blocked(self),
                _ => return Attempt::Lost(err),
            }
        }
    }
}
