/// An I/O event reported by the poller.
///
/// Readiness information for one registered descriptor, identified by the
/// token it was registered with.
#[derive(Debug)]
pub(crate) struct Event {
    /// Token associated with the registered file descriptor.
    pub(crate) token: usize,

    /// Data (or end of stream) can be read.
    pub(crate) readable: bool,

    /// The send buffer has room.
    pub(crate) writable: bool,

    /// The peer hung up or the socket is in an error state.
    pub(crate) hangup: bool,
}
