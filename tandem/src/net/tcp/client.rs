use super::buffer::Buffers;
use super::builder::{ClientBuilder, ClientConfig};
use super::handler::{DisconnectionHandler, ReceiveAction, ReceiveHandler};
use super::socket;
use crate::error::ClientError;
use crate::reactor::{DisconnectCallback, Reactor};

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, warn};

use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A full-duplex TCP client connection.
///
/// Once connected, inbound bytes are pumped continuously to the receive
/// handler and bytes passed to [`send`](Self::send) are queued and written in
/// order by the reactor. Handlers run on the reactor's threads.
///
/// `TcpClient` is a cheap, clonable handle; all clones drive the same
/// connection. Dropping the last handle disconnects. Handlers must not
/// capture a strong handle to the client they are installed on, or the
/// client is kept alive until it disconnects.
///
/// # Examples
///
/// ```rust,ignore
/// let io = Arc::new(IoService::new()?);
/// let client = TcpClient::new(io.clone());
///
/// client.connect(
///     "127.0.0.1",
///     6379,
///     |_| eprintln!("connection lost"),
///     |_, bytes| {
///         println!("{} bytes", bytes.len());
///         ReceiveAction::Continue
///     },
/// )?;
///
/// client.send("PING\r\n")?;
/// ```
#[derive(Clone)]
pub struct TcpClient {
    inner: Arc<Inner>,
}

pub(super) struct Inner {
    /// Reactor every operation is issued to.
    pub(super) reactor: Arc<dyn Reactor>,

    pub(super) config: ClientConfig,

    /// Serializes connect attempts so the handshake runs without holding
    /// `state`.
    connect_lock: Mutex<()>,

    /// Connection state. Shared while issuing I/O, exclusive for transitions.
    pub(super) state: RwLock<State>,

    /// Write queue and read scratch buffer. Always locked after `state`.
    pub(super) buffers: Mutex<Buffers>,

    /// Source of session epochs.
    epochs: AtomicU64,
}

pub(super) enum State {
    Disconnected,
    Connected(Session),
}

/// One established connection.
pub(super) struct Session {
    socket: OwnedFd,

    /// Stamped on every callback issued for this connection.
    pub(super) epoch: u64,

    pub(super) handlers: Handlers,
}

pub(super) struct Handlers {
    pub(super) on_receive: ReceiveHandler,
    pub(super) on_disconnect: DisconnectionHandler,
}

/// Weak handle captured by reactor callbacks.
pub(super) struct WeakClient(Weak<Inner>);

impl WeakClient {
    pub(super) fn upgrade(&self) -> Option<TcpClient> {
        self.0.upgrade().map(|inner| TcpClient { inner })
    }
}

impl Session {
    pub(super) fn fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl State {
    /// The live session, if any.
    pub(super) fn current(&self) -> Option<&Session> {
        match self {
            State::Connected(session) => Some(session),
            State::Disconnected => None,
        }
    }

    /// The live session, provided it is the one stamped with `epoch`.
    pub(super) fn session(&self, epoch: u64) -> Option<&Session> {
        self.current().filter(|session| session.epoch == epoch)
    }
}

impl Inner {
    /// Moves to `Disconnected`: hands the descriptor to the reactor to be
    /// untracked and closed, then clears both buffers.
    ///
    /// Returns the handlers of the torn down session, or `None` when already
    /// disconnected. Callers drop or invoke them after releasing `state`.
    fn teardown(&self, state: &mut State) -> Option<Handlers> {
        let State::Connected(Session {
            socket, handlers, ..
        }) = std::mem::replace(state, State::Disconnected)
        else {
            return None;
        };

        let fd = socket.as_raw_fd();
        self.reactor.untrack(socket);

        self.buffers.lock().clear();

        debug!(fd, "socket released and buffers cleared");
        Some(handlers)
    }
}

impl TcpClient {
    /// Creates a disconnected client issuing its I/O to `reactor`.
    pub fn new(reactor: Arc<dyn Reactor>) -> Self {
        Self::with_config(reactor, ClientConfig::default())
    }

    /// Returns a builder to configure a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn with_config(reactor: Arc<dyn Reactor>, config: ClientConfig) -> Self {
        debug!(read_size = config.read_size, "tcp client created");

        Self {
            inner: Arc::new(Inner {
                reactor,
                config,
                connect_lock: Mutex::new(()),
                state: RwLock::new(State::Disconnected),
                buffers: Mutex::new(Buffers::default()),
                epochs: AtomicU64::new(0),
            }),
        }
    }

    /// Connects to `host:port` and starts reading.
    ///
    /// Blocks until the handshake succeeds or fails. On success both handlers
    /// replace those of any previous connection: `on_receive` gets every
    /// inbound chunk, `on_disconnect` is invoked once if the connection is
    /// lost without [`disconnect`](Self::disconnect) being called.
    ///
    /// # Errors
    ///
    /// - [`ClientError::AlreadyConnected`] if a connection is established;
    ///   the existing connection is left untouched.
    /// - [`ClientError::SocketCreationFailed`],
    ///   [`ClientError::HostResolutionFailed`] or
    ///   [`ClientError::ConnectFailed`] if the respective step fails. No
    ///   descriptor is held afterwards.
    pub fn connect<D, R>(
        &self,
        host: &str,
        port: u16,
        on_disconnect: D,
        on_receive: R,
    ) -> Result<(), ClientError>
    where
        D: Fn(&TcpClient) + Send + Sync + 'static,
        R: Fn(&TcpClient, &[u8]) -> ReceiveAction + Send + Sync + 'static,
    {
        debug!(host, port, "attempting to connect");

        let _connecting = self.inner.connect_lock.lock();

        if self.is_connected() {
            warn!(host, port, "already connected");
            return Err(ClientError::AlreadyConnected);
        }

        let socket = socket::establish(host, port, &self.inner.config)?;
        let fd = socket.as_raw_fd();
        let epoch = self.inner.epochs.fetch_add(1, Ordering::Relaxed) + 1;

        let mut state = self.inner.state.write();

        self.inner
            .reactor
            .track(fd, self.remote_disconnect_callback(epoch));

        *state = State::Connected(Session {
            socket,
            epoch,
            handlers: Handlers {
                on_receive: Arc::new(on_receive),
                on_disconnect: Arc::new(on_disconnect),
            },
        });

        debug!(fd, host, port, epoch, "connected");

        let state = RwLockWriteGuard::downgrade(state);
        if let Some(session) = state.session(epoch) {
            self.start_read(session);
        }

        Ok(())
    }

    /// Closes the connection.
    ///
    /// Queued outbound bytes are discarded. The disconnection handler is not
    /// invoked. Does nothing when already disconnected.
    pub fn disconnect(&self) {
        debug!("attempting to disconnect");

        let handlers = {
            let mut state = self.inner.state.write();
            self.inner.teardown(&mut state)
        };

        match handlers {
            Some(_) => debug!("disconnected"),
            None => debug!("already disconnected"),
        }
    }

    /// Returns whether a connection is established.
    pub fn is_connected(&self) -> bool {
        self.inner.state.read().current().is_some()
    }

    pub(super) fn downgrade(&self) -> WeakClient {
        WeakClient(Arc::downgrade(&self.inner))
    }

    pub(super) fn inner(&self) -> &Inner {
        &self.inner
    }

    /// Tears down the session stamped with `epoch`, if it is still live.
    ///
    /// Local teardown: the disconnection handler is not invoked.
    pub(super) fn disconnect_session(&self, epoch: u64) {
        let handlers = {
            let mut state = self.inner.state.write();
            if state.session(epoch).is_none() {
                return;
            }
            self.inner.teardown(&mut state)
        };

        if handlers.is_some() {
            debug!(epoch, "disconnected");
        }
    }

    fn remote_disconnect_callback(&self, epoch: u64) -> DisconnectCallback {
        let client = self.downgrade();

        Box::new(move || {
            if let Some(client) = client.upgrade() {
                client.on_remote_disconnect(epoch);
            }
        })
    }

    /// Handles loss of the connection reported by the reactor.
    fn on_remote_disconnect(&self, epoch: u64) {
        debug!(epoch, "remote disconnection reported");

        let handlers = {
            let mut state = self.inner.state.write();
            if state.session(epoch).is_none() {
                debug!(epoch, "connection already closed, notification ignored");
                return;
            }
            self.inner.teardown(&mut state)
        };

        if let Some(handlers) = handlers {
            debug!(epoch, "calling disconnection handler");
            (handlers.on_disconnect)(self);
        }
    }
}

impl fmt::Debug for TcpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpClient")
            .field("connected", &self.is_connected())
            .field("read_size", &self.inner.config.read_size)
            .finish()
    }
}

impl Drop for Inner {
    /// Disconnects locally when the last client handle goes away.
    fn drop(&mut self) {
        let handlers = {
            let mut state = self.state.write();
            self.teardown(&mut state)
        };

        if handlers.is_some() {
            debug!("tcp client dropped while connected, disconnected");
        }
        debug!("tcp client destroyed");
    }
}
