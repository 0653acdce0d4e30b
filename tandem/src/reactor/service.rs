use super::command::Command;
use super::core::EventLoop;
use super::poller::{Poller, Waker};
use super::{DisconnectCallback, ReadCallback, Reactor, WriteCallback};
use crate::error::IoServiceError;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, error};

use std::io;
use std::os::fd::{OwnedFd, RawFd};
use std::sync::Arc;
use std::sync::mpsc::{Sender, channel};
use std::thread::{self, JoinHandle, ThreadId};

/// Default number of readiness events fetched per poll.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Default name of the event loop thread.
const DEFAULT_THREAD_NAME: &str = "tandem-io";

/// An epoll-backed [`Reactor`] running its event loop on a dedicated thread.
///
/// Completion callbacks run on that thread, one at a time. Share the service
/// between clients with an [`Arc`]; the loop stops when the last handle is
/// dropped.
///
/// # Examples
///
/// ```rust,ignore
/// let io = Arc::new(IoService::new()?);
/// let client = TcpClient::new(io.clone());
/// ```
pub struct IoService {
    /// Command channel into the event loop.
    sender: Sender<Command>,

    /// Interrupts a blocking poll when a command is queued.
    waker: Arc<Waker>,

    /// Event loop thread, joined on drop.
    thread: Mutex<Option<JoinHandle<io::Result<()>>>>,

    /// Identifier of the event loop thread.
    thread_id: ThreadId,
}

impl IoService {
    /// Starts an I/O service with the default configuration.
    pub fn new() -> Result<Self, IoServiceError> {
        IoServiceBuilder::new().build()
    }

    /// Returns a builder to configure the I/O service.
    pub fn builder() -> IoServiceBuilder {
        IoServiceBuilder::new()
    }

    fn submit(&self, command: Command) {
        if self.sender.send(command).is_err() {
            debug!("I/O service loop is gone, command dropped");
            return;
        }

        self.waker.wake();
    }
}

impl Reactor for IoService {
    fn track(&self, fd: RawFd, on_remote_disconnect: DisconnectCallback) {
        self.submit(Command::Track {
            fd,
            on_disconnect: on_remote_disconnect,
        });
    }

    fn untrack(&self, socket: OwnedFd) {
        self.submit(Command::Untrack { socket });
    }

    fn async_read(&self, fd: RawFd, buffer: BytesMut, max_len: usize, on_complete: ReadCallback) {
        self.submit(Command::Read {
            fd,
            buffer,
            max_len,
            on_complete,
        });
    }

    fn async_write(&self, fd: RawFd, buffer: Bytes, on_complete: WriteCallback) {
        self.submit(Command::Write {
            fd,
            buffer,
            on_complete,
        });
    }
}

impl Drop for IoService {
    /// Stops the event loop.
    ///
    /// Sends a shutdown command and joins the loop thread. When the last
    /// handle is released from inside a completion callback, the thread is
    /// detached instead, since it cannot join itself.
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        self.waker.wake();

        let Some(thread) = self.thread.lock().take() else {
            return;
        };

        if thread::current().id() == self.thread_id {
            debug!("I/O service dropped from its own thread, detaching");
            return;
        }

        match thread.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(error = %err, "I/O service loop failed"),
            Err(_) => error!("I/O service loop panicked"),
        }
    }
}

/// Builder for configuring and starting an [`IoService`].
///
/// # Examples
///
/// ```rust,ignore
/// let io = IoServiceBuilder::new()
///     .event_capacity(256)
///     .thread_name("redis-io")
///     .build()?;
/// ```
pub struct IoServiceBuilder {
    /// Number of readiness events fetched per poll.
    event_capacity: usize,

    /// Name given to the event loop thread.
    thread_name: String,
}

impl IoServiceBuilder {
    /// Creates a new `IoServiceBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Sets how many readiness events are fetched per poll.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "event_capacity must be > 0");

        self.event_capacity = n;
        self
    }

    /// Sets the name of the event loop thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Creates the poller and spawns the event loop thread.
    pub fn build(self) -> Result<IoService, IoServiceError> {
        let poller = Poller::new(self.event_capacity).map_err(IoServiceError::Poller)?;
        let waker = poller.waker();
        let (sender, receiver) = channel();

        let mut event_loop = EventLoop::new(receiver, poller, self.event_capacity);

        let thread = thread::Builder::new()
            .name(self.thread_name)
            .spawn(move || event_loop.run())
            .map_err(IoServiceError::Spawn)?;
        let thread_id = thread.thread().id();

        Ok(IoService {
            sender,
            waker,
            thread: Mutex::new(Some(thread)),
            thread_id,
        })
    }
}

impl Default for IoServiceBuilder {
    /// Creates a default `IoServiceBuilder`.
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "event_capacity must be > 0")]
    fn test_zero_event_capacity_panics() {
        let _ = IoServiceBuilder::new().event_capacity(0);
    }

    #[test]
    fn test_start_and_drop() {
        let io = IoService::builder()
            .thread_name("tandem-io-test")
            .build()
            .expect("Failed to start I/O service");

        drop(io);
    }

    #[test]
    fn test_operations_on_untracked_descriptor_are_dropped() {
        let io = IoService::new().expect("Failed to start I/O service");

        io.async_read(-1, BytesMut::new(), 16, Box::new(|_, _| panic!("read completed")));
        io.async_write(-1, Bytes::from_static(b"x"), Box::new(|_| panic!("write completed")));
        drop(io);
    }

    #[test]
    fn test_untrack_closes_descriptor() {
        let io = IoService::new().expect("Failed to start I/O service");

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        io.untrack(OwnedFd::from(listener));

        drop(io);

        assert!(std::net::TcpStream::connect(addr).is_err());
    }
}
