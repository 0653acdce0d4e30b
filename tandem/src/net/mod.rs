//! TCP networking primitives.
//!
//! Exposes [`TcpClient`], a full-duplex client connection whose reads and
//! writes are driven by a [`Reactor`](crate::reactor::Reactor).
mod tcp;

pub use tcp::{ClientBuilder, ReceiveAction, TcpClient};
