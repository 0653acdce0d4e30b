use super::command::Command;
use super::event::Event;
use super::io::{Attempt, PendingRead, PendingWrite, Registration};
use super::poller::Poller;
use crate::utils::Slab;

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::{debug, error, warn};

/// Work produced while handling events, run once no registration is borrowed.
enum Completion {
    Read(PendingRead, usize),
    Write(PendingWrite, usize),
    Disconnect(Registration),
}

/// The event loop driving every tracked descriptor.
///
/// Runs on the I/O service thread. Commands arrive over a channel; completion
/// callbacks are invoked on this thread.
pub(crate) struct EventLoop {
    receiver: Receiver<Command>,

    poller: Poller,
    events: Vec<Event>,

    registrations: Slab<Registration>,
    tokens: HashMap<RawFd, usize>,
}

impl EventLoop {
    pub(crate) fn new(receiver: Receiver<Command>, poller: Poller, capacity: usize) -> Self {
        Self {
            receiver,
            poller,
            events: Vec::with_capacity(capacity),
            registrations: Slab::new(capacity),
            tokens: HashMap::new(),
        }
    }

    /// Runs until a shutdown command arrives or every handle is gone.
    pub(crate) fn run(&mut self) -> io::Result<()> {
        debug!("I/O service loop started");

        loop {
            if !self.drain_commands() {
                break;
            }

            if let Err(err) = self.poller.poll(&mut self.events) {
                error!(error = %err, "poll failed, stopping I/O service loop");
                return Err(err);
            }

            let events = std::mem::take(&mut self.events);
            for event in &events {
                self.handle_event(event);
            }
            self.events = events;
        }

        debug!("I/O service loop stopped");
        Ok(())
    }

    /// Reports every remaining registration as disconnected.
    ///
    /// Runs when the loop goes away for any reason, including a failed poll
    /// or a panicking callback, so no client is left believing it is
    /// connected to a dead loop.
    fn abandon(&mut self) {
        let registrations: Vec<Registration> = self.registrations.drain().collect();
        self.tokens.clear();

        if registrations.is_empty() {
            return;
        }

        warn!(count = registrations.len(), "I/O service loop exited with tracked descriptors");

        for registration in registrations {
            self.poller.deregister(registration.fd);
            (registration.on_disconnect)();
        }
    }

    /// Applies every queued command. Returns `false` once the loop must stop.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.receiver.try_recv() {
                Ok(Command::Track { fd, on_disconnect }) => self.track(fd, on_disconnect),
                Ok(Command::Untrack { socket }) => self.untrack(socket),
                Ok(Command::Read {
                    fd,
                    buffer,
                    max_len,
                    on_complete,
                }) => {
                    let read = PendingRead {
                        buffer,
                        max_len,
                        on_complete,
                    };
                    self.with_registration(fd, |registration| {
                        if registration.read.replace(read).is_some() {
                            warn!(fd, "async_read replaced a pending read");
                        }
                    });
                }
                Ok(Command::Write {
                    fd,
                    buffer,
                    on_complete,
                }) => {
                    let write = PendingWrite {
                        buffer,
                        on_complete,
                    };
                    self.with_registration(fd, |registration| {
                        if registration.write.replace(write).is_some() {
                            warn!(fd, "async_write replaced a pending write");
                        }
                    });
                }
                Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => return false,
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    fn track(&mut self, fd: RawFd, on_disconnect: super::DisconnectCallback) {
        if self.tokens.contains_key(&fd) {
            warn!(fd, "descriptor tracked twice, dropping the previous registration");
            self.forget(fd);
        }

        let token = self
            .registrations
            .insert(Registration::new(fd, on_disconnect));

        match self.poller.register(fd, token, Default::default()) {
            Ok(()) => {
                debug!(fd, token, "descriptor tracked");
                self.tokens.insert(fd, token);
            }
            Err(err) => {
                error!(fd, error = %err, "failed to register descriptor");
                if let Some(registration) = self.registrations.remove(token) {
                    (registration.on_disconnect)();
                }
            }
        }
    }

    /// Drops the registration, then closes the descriptor.
    fn untrack(&mut self, socket: OwnedFd) {
        let fd = socket.as_raw_fd();

        if !self.forget(fd) {
            debug!(fd, "untrack of a descriptor that is not tracked");
        }

        drop(socket);
        debug!(fd, "descriptor untracked and closed");
    }

    /// Removes the registration for `fd` without firing its callbacks.
    fn forget(&mut self, fd: RawFd) -> bool {
        let Some(token) = self.tokens.remove(&fd) else {
            return false;
        };

        self.poller.deregister(fd);
        self.registrations.remove(token);

        true
    }

    /// Runs `f` on the registration for `fd`, then syncs its poller interest.
    fn with_registration(&mut self, fd: RawFd, f: impl FnOnce(&mut Registration)) {
        let Some(&token) = self.tokens.get(&fd) else {
            debug!(fd, "operation on an untracked descriptor dropped");
            return;
        };

        let Some(registration) = self.registrations.get_mut(token) else {
            return;
        };

        f(registration);
        self.sync_interest(token);
    }

    fn sync_interest(&mut self, token: usize) {
        let Some(registration) = self.registrations.get_mut(token) else {
            return;
        };

        let wanted = registration.wanted_interest();
        if wanted == registration.interest {
            return;
        }

        let fd = registration.fd;
        match self.poller.reregister(fd, token, wanted) {
            Ok(()) => registration.interest = wanted,
            Err(err) => {
                error!(fd, error = %err, "failed to update interest");
                self.lose(token);
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        let mut completions = Vec::new();

        {
            let Some(registration) = self.registrations.get_mut(event.token) else {
                return;
            };
            let fd = registration.fd;
            let mut lost = None;

            if event.readable || event.hangup {
                if let Some(read) = registration.read.take() {
                    match read.attempt(fd) {
                        Attempt::Done(read, n) => completions.push(Completion::Read(read, n)),
                        Attempt::Blocked(read) => registration.read = Some(read),
                        Attempt::Lost(err) => lost = Some(err),
                    }
                } else if event.hangup {
                    lost = Some(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "socket hung up",
                    ));
                }
            }

            if lost.is_none() && event.writable {
                if let Some(write) = registration.write.take() {
                    match write.attempt(fd) {
                        Attempt::Done(write, n) => completions.push(Completion::Write(write, n)),
                        Attempt::Blocked(write) => registration.write = Some(write),
                        Attempt::Lost(err) => lost = Some(err),
                    }
                }
            }

            if let Some(err) = lost {
                debug!(fd, error = %err, "remote disconnection detected");
                // Bytes already read are delivered before the disconnection.
                completions.retain(|completion| matches!(completion, Completion::Read(..)));
                if let Some(registration) = self.detach(event.token) {
                    completions.push(Completion::Disconnect(registration));
                }
            } else {
                self.sync_interest(event.token);
            }
        }

        for completion in completions {
            match completion {
                Completion::Read(read, n) => (read.on_complete)(read.buffer, n),
                Completion::Write(write, n) => (write.on_complete)(n),
                Completion::Disconnect(registration) => (registration.on_disconnect)(),
            }
        }
    }

    /// Removes a registration from the poller and the lookup tables.
    fn detach(&mut self, token: usize) -> Option<Registration> {
        let registration = self.registrations.remove(token)?;
        self.tokens.remove(&registration.fd);
        self.poller.deregister(registration.fd);

        Some(registration)
    }

    /// Detaches a registration and fires its disconnect callback.
    fn lose(&mut self, token: usize) {
        if let Some(registration) = self.detach(token) {
            (registration.on_disconnect)();
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.abandon();
    }
}
