//! # Tandem
//!
//! **Tandem** is a full-duplex TCP client driven by a callback reactor.
//!
//! A [`TcpClient`] connects synchronously, then runs two independent pumps:
//!
//! - a **read pump** that keeps exactly one read outstanding and hands every
//!   inbound chunk to a user receive handler,
//! - a **write pump** that drains a locked FIFO queue with exactly one write
//!   outstanding, so concurrent [`send`](TcpClient::send) calls never
//!   interleave on the wire.
//!
//! Loss of the connection that the client did not ask for is reported once
//! through a disconnection handler.
//!
//! The client does not own an event loop. It is handed a [`Reactor`] at
//! construction; [`IoService`] is the bundled epoll implementation.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tandem::{IoService, ReceiveAction, TcpClient};
//!
//! let io = Arc::new(IoService::new()?);
//! let client = TcpClient::new(io.clone());
//!
//! client.connect(
//!     "127.0.0.1",
//!     6379,
//!     |_| eprintln!("server went away"),
//!     |_, reply| {
//!         println!("{}", String::from_utf8_lossy(reply));
//!         ReceiveAction::Continue
//!     },
//! )?;
//!
//! client.send("PING\r\n")?;
//! ```
//!
//! ## Modules
//!
//! - [`net`] — The TCP client
//! - [`reactor`] — The reactor contract and the epoll I/O service
//! - [`error`] — Error types
//!
//! Logging goes through [`tracing`]; install a subscriber to see it.

mod utils;

pub mod error;
pub mod net;
pub mod reactor;

pub use error::{ClientError, IoServiceError};
pub use net::{ClientBuilder, ReceiveAction, TcpClient};
pub use reactor::{IoService, IoServiceBuilder, Reactor};
