//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Register file descriptors with read/write interests
//! - Block waiting for I/O readiness
//! - Wake the event loop when new commands are submitted
//!
//! Registrations are level-triggered. `EPOLLHUP` and `EPOLLERR` are always
//! reported by the kernel, so a descriptor registered with an empty interest
//! still surfaces remote closure.

use super::common::Interest;
use crate::reactor::event::Event;
use crate::reactor::poller::Waker;

use libc::{
    EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD,
    EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
    eventfd,
};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;

/// Reserved token used internally for the wake-up event.
///
/// Slab indices never reach `u64::MAX`.
const WAKE_TOKEN: u64 = u64::MAX;

/// Linux `epoll` poller.
///
/// Owns the epoll instance, an `eventfd` used as a wake-up signal and a
/// reusable event buffer.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: OwnedFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,

    /// Waker wrapping the internal eventfd.
    waker: Arc<Waker>,
}

impl Waker {
    /// Wake the poller.
    ///
    /// Writes to the internal `eventfd`, causing `epoll_wait` to return.
    pub(crate) fn wake(&self) {
        let buf: u64 = 1;
        unsafe {
            libc::write(self.0.as_raw_fd(), &buf as *const _ as *const _, 8);
        }
    }

    /// Resets the `eventfd` counter after a wake-up was observed.
    fn drain(&self) {
        let mut buf = 0u64;
        unsafe {
            libc::read(self.0.as_raw_fd(), &mut buf as *mut _ as *mut _, 8);
        }
    }
}

impl EpollPoller {
    /// Create a new `EpollPoller` with room for `capacity` events per poll.
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let raw = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        let epoll = unsafe { OwnedFd::from_raw_fd(raw) };

        let raw = unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        let wake_fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN,
        };

        let rc = unsafe {
            epoll_ctl(
                epoll.as_raw_fd(),
                EPOLL_CTL_ADD,
                wake_fd.as_raw_fd(),
                &mut event,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(capacity),
            waker: Arc::new(Waker(wake_fd)),
        })
    }

    /// Return the poller waker.
    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Register a file descriptor with the poller.
    pub(crate) fn register(&self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        self.control(EPOLL_CTL_ADD, fd, token, interest)
    }

    /// Update interest flags for an already registered descriptor.
    pub(crate) fn reregister(
        &self,
        fd: RawFd,
        token: usize,
        interest: Interest,
    ) -> io::Result<()> {
        self.control(EPOLL_CTL_MOD, fd, token, interest)
    }

    /// Remove a file descriptor from the poller.
    ///
    /// Fails harmlessly when the descriptor was already closed, since the
    /// kernel drops closed descriptors from the interest list on its own.
    pub(crate) fn deregister(&self, fd: RawFd) {
        unsafe {
            epoll_ctl(
                self.epoll.as_raw_fd(),
                EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            );
        }
    }

    fn control(&self, op: i32, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        let mut flags = 0;

        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll.as_raw_fd(), op, fd, &mut event) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Poll for I/O readiness events.
    ///
    /// Blocks until at least one file descriptor becomes ready or the wake
    /// event is triggered.
    pub(crate) fn poll(&mut self, events: &mut Vec<Event>) -> io::Result<()> {
        events.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll.as_raw_fd(),
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                -1,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            let (flags, data) = (ev.events, ev.u64);

            if data == WAKE_TOKEN {
                self.waker.drain();
                continue;
            }

            let token = data as usize;

            let readable = flags & (EPOLLIN as u32) != 0;
            let writable = flags & (EPOLLOUT as u32) != 0;
            let hangup = flags & ((EPOLLHUP | EPOLLERR) as u32) != 0;

            if let Some(e) = events.iter_mut().find(|e| e.token == token) {
                e.readable |= readable;
                e.writable |= writable;
                e.hangup |= hangup;
            } else {
                events.push(Event {
                    token,
                    readable,
                    writable,
                    hangup,
                });
            }
        }

        unsafe {
            self.events.set_len(0);
        }

        Ok(())
    }
}
