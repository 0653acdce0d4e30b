use super::{DisconnectCallback, ReadCallback, WriteCallback};

use bytes::{Bytes, BytesMut};

use std::os::fd::{OwnedFd, RawFd};

/// Requests submitted to the event loop thread.
pub(crate) enum Command {
    Track {
        fd: RawFd,
        on_disconnect: DisconnectCallback,
    },
    Untrack {
        socket: OwnedFd,
    },
    Read {
        fd: RawFd,
        buffer: BytesMut,
        max_len: usize,
        on_complete: ReadCallback,
    },
    Write {
        fd: RawFd,
        buffer: Bytes,
        on_complete: WriteCallback,
    },
    Shutdown,
}
