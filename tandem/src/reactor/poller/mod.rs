//! Platform-specific I/O poller abstraction.
//!
//! The poller is used by the event loop to:
//! - wait for I/O readiness events,
//! - wake the loop when new commands arrive.
//!
//! Only the Linux `epoll` backend exists today.

pub(crate) mod common;

pub(crate) use common::Waker;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
