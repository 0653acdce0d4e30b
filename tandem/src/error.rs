//! Error types.
//!
//! Every error surfaced by the client is synchronous: it is returned to the
//! immediate caller of [`connect`](crate::net::TcpClient::connect) or
//! [`send`](crate::net::TcpClient::send) and is never retried internally.
//! Failures of in-flight reads and writes are not reported here; the reactor
//! turns them into a remote disconnection instead.

use std::io;

use thiserror::Error;

/// Errors returned by [`TcpClient`](crate::net::TcpClient) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `connect` was called while a connection is already established.
    #[error("client already connected")]
    AlreadyConnected,

    /// The socket could not be opened.
    #[error("can't open a socket: {0}")]
    SocketCreationFailed(#[source] io::Error),

    /// The host name did not resolve to a usable address.
    #[error("no such host: {host}")]
    HostResolutionFailed {
        host: String,
        #[source]
        source: io::Error,
    },

    /// The connection handshake failed.
    #[error("failed to connect to {host}:{port}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// `send` was called without an established connection.
    #[error("not connected")]
    NotConnected,
}

/// Errors raised while starting an [`IoService`](crate::reactor::IoService).
#[derive(Debug, Error)]
pub enum IoServiceError {
    /// The epoll instance or its wake-up descriptor could not be created.
    #[error("failed to create poller: {0}")]
    Poller(#[source] io::Error),

    /// The event loop thread could not be spawned.
    #[error("failed to spawn the I/O service thread: {0}")]
    Spawn(#[source] io::Error),
}
