use super::client::TcpClient;
use crate::reactor::Reactor;

use std::sync::Arc;

/// Default maximum number of bytes requested per read.
pub(crate) const DEFAULT_READ_SIZE: usize = 4096;

/// Settings applied to every connection a client makes.
#[derive(Clone, Debug)]
pub(crate) struct ClientConfig {
    /// Maximum number of bytes requested per read.
    pub(crate) read_size: usize,

    /// Whether `TCP_NODELAY` is set on connected sockets.
    pub(crate) nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_size: DEFAULT_READ_SIZE,
            nodelay: false,
        }
    }
}

/// Builder for configuring a [`TcpClient`].
///
/// # Examples
///
/// ```rust,ignore
/// let client = ClientBuilder::new()
///     .read_size(16 * 1024)
///     .nodelay(true)
///     .build(io.clone());
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of bytes requested per read.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn read_size(mut self, n: usize) -> Self {
        assert!(n > 0, "read_size must be > 0");

        self.config.read_size = n;
        self
    }

    /// Enables or disables `TCP_NODELAY` on connected sockets.
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.config.nodelay = enabled;
        self
    }

    /// Builds a disconnected client bound to `reactor`.
    pub fn build(self, reactor: Arc<dyn Reactor>) -> TcpClient {
        TcpClient::with_config(reactor, self.config)
    }
}
