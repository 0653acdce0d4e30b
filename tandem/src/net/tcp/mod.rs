//! TCP client implementation.
//!
//! Split by concern:
//! - `client`: connection state machine, connect and disconnect,
//! - `write`: the send path and write pump,
//! - `read`: the read pump,
//! - `buffer`: the locked write queue and read scratch buffer,
//! - `socket`: blocking socket setup.

mod buffer;
mod builder;
mod client;
mod handler;
mod read;
mod socket;
mod write;

pub use builder::ClientBuilder;
pub use client::TcpClient;
pub use handler::ReceiveAction;
