#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tandem::reactor::{DisconnectCallback, ReadCallback, Reactor, WriteCallback};

use std::net::TcpListener;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

/// A request the client made to the reactor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Track(RawFd),
    Untrack(RawFd),
    Read { fd: RawFd, max_len: usize },
    Write { fd: RawFd, data: Bytes },
}

/// A reactor that never touches the socket.
///
/// Every request is recorded, and completions are fired by hand from the
/// test. Untracking drops the pending operations and closes the socket, like a
/// real reactor.
#[derive(Default)]
pub struct ScriptedReactor {
    script: Mutex<Script>,
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    on_disconnect: Option<DisconnectCallback>,
    read: Option<(BytesMut, usize, ReadCallback)>,
    write: Option<(Bytes, WriteCallback)>,
}

impl Reactor for ScriptedReactor {
    fn track(&self, fd: RawFd, on_remote_disconnect: DisconnectCallback) {
        let mut script = self.script.lock();
        script.calls.push(Call::Track(fd));
        script.on_disconnect = Some(on_remote_disconnect);
    }

    fn untrack(&self, socket: OwnedFd) {
        let dropped = {
            let mut script = self.script.lock();
            script.calls.push(Call::Untrack(socket.as_raw_fd()));
            (
                script.on_disconnect.take(),
                script.read.take(),
                script.write.take(),
            )
        };
        drop(dropped);
        drop(socket);
    }

    fn async_read(&self, fd: RawFd, buffer: BytesMut, max_len: usize, on_complete: ReadCallback) {
        let mut script = self.script.lock();
        assert!(script.read.is_none(), "a read is already outstanding");

        script.calls.push(Call::Read { fd, max_len });
        script.read = Some((buffer, max_len, on_complete));
    }

    fn async_write(&self, fd: RawFd, buffer: Bytes, on_complete: WriteCallback) {
        let mut script = self.script.lock();
        assert!(script.write.is_none(), "a write is already outstanding");

        script.calls.push(Call::Write {
            fd,
            data: buffer.clone(),
        });
        script.write = Some((buffer, on_complete));
    }
}

impl ScriptedReactor {
    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub fn reads_issued(&self) -> usize {
        self.count(|call| matches!(call, Call::Read { .. }))
    }

    pub fn untracks(&self) -> usize {
        self.count(|call| matches!(call, Call::Untrack(_)))
    }

    /// Contents of every write request, oldest first.
    pub fn writes_issued(&self) -> Vec<Bytes> {
        self.script
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Write { data, .. } => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn pending_write(&self) -> Option<Bytes> {
        self.script
            .lock()
            .write
            .as_ref()
            .map(|(data, _)| data.clone())
    }

    pub fn has_pending_read(&self) -> bool {
        self.script.lock().read.is_some()
    }

    /// Delivers `data` to the outstanding read. Returns `false` if none.
    pub fn complete_read(&self, data: &[u8]) -> bool {
        let Some((mut buffer, max_len, on_complete)) = self.script.lock().read.take() else {
            return false;
        };

        assert!(data.len() <= max_len, "read delivered more than requested");
        buffer.extend_from_slice(data);
        on_complete(buffer, data.len());

        true
    }

    /// Reports `written` bytes for the outstanding write. Returns `false` if
    /// none.
    pub fn complete_write(&self, written: usize) -> bool {
        let Some((_, on_complete)) = self.script.lock().write.take() else {
            return false;
        };

        on_complete(written);
        true
    }

    /// Fires the remote disconnection callback, dropping pending operations.
    pub fn remote_disconnect(&self) -> bool {
        let (on_disconnect, _read, _write) = {
            let mut script = self.script.lock();
            (
                script.on_disconnect.take(),
                script.read.take(),
                script.write.take(),
            )
        };

        match on_disconnect {
            Some(on_disconnect) => {
                on_disconnect();
                true
            }
            None => false,
        }
    }

    /// Takes the outstanding read out of the script without completing it.
    pub fn steal_read(&self) -> Option<ReadCallback> {
        self.script.lock().read.take().map(|(_, _, cb)| cb)
    }

    /// Takes the outstanding write out of the script without completing it.
    pub fn steal_write(&self) -> Option<WriteCallback> {
        self.script.lock().write.take().map(|(_, cb)| cb)
    }

    /// Takes the remote disconnection callback without firing it.
    pub fn steal_disconnect(&self) -> Option<DisconnectCallback> {
        self.script.lock().on_disconnect.take()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }
}

/// Binds a listener on an ephemeral loopback port.
///
/// Connections complete their handshake against the listener backlog, so
/// tests that never read from the peer do not need to accept.
pub fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let port = listener
        .local_addr()
        .expect("Failed to get local address")
        .port();

    (listener, port)
}
