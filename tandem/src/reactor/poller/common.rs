use std::os::fd::OwnedFd;

/// Readiness a registered descriptor is waiting for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

/// Handle used to interrupt a blocking poll from another thread.
pub(crate) struct Waker(pub(crate) OwnedFd);
