//! Internal data structures.
//!
//! Exposes the [`Slab`] used by the event loop to map epoll tokens to
//! registrations.

mod slab;

pub(crate) use slab::Slab;
