use bytes::{Buf, Bytes, BytesMut};

/// Byte buffers shared between caller threads and reactor callbacks.
///
/// Always accessed under the client's buffer lock, which is held only for
/// the duration of one of these calls. Outbound bytes are never copied once
/// queued: the batch handed to the reactor is frozen out of the tail and
/// advanced in place on short writes.
#[derive(Default)]
pub(crate) struct Buffers {
    /// Untransmitted part of the batch the reactor is writing. Non-empty
    /// exactly while a write is in flight.
    in_flight: Bytes,

    /// Bytes queued behind the in-flight batch, oldest first.
    write_queue: BytesMut,

    /// Scratch space for inbound chunks while it is not lent to the reactor.
    read_scratch: BytesMut,
}

impl Buffers {
    /// Appends `bytes` to the write queue.
    ///
    /// Returns the batch to write when no write was in flight, or `None`
    /// when the running write will pick the new bytes up on completion.
    pub(crate) fn enqueue(&mut self, bytes: &[u8]) -> Option<Bytes> {
        self.write_queue.extend_from_slice(bytes);

        if !self.in_flight.is_empty() {
            return None;
        }

        Some(self.next_batch())
    }

    /// Drops `written` bytes from the front of the in-flight batch.
    ///
    /// Returns what must be written next: the rest of the batch after a
    /// short write, otherwise everything queued meanwhile. `None` once the
    /// queue is drained.
    pub(crate) fn consume(&mut self, written: usize) -> Option<Bytes> {
        let written = written.min(self.in_flight.len());
        self.in_flight.advance(written);

        if !self.in_flight.is_empty() {
            return Some(self.in_flight.clone());
        }

        if self.write_queue.is_empty() {
            return None;
        }

        Some(self.next_batch())
    }

    /// Moves the whole tail into flight.
    fn next_batch(&mut self) -> Bytes {
        self.in_flight = self.write_queue.split().freeze();
        self.in_flight.clone()
    }

    /// Number of outbound bytes not yet written.
    pub(crate) fn queued(&self) -> usize {
        self.in_flight.len() + self.write_queue.len()
    }

    /// Hands the scratch buffer out for the next read.
    pub(crate) fn lend_scratch(&mut self) -> BytesMut {
        std::mem::take(&mut self.read_scratch)
    }

    /// Takes the scratch buffer back once a chunk has been dispatched.
    pub(crate) fn restore_scratch(&mut self, mut scratch: BytesMut) {
        scratch.clear();
        self.read_scratch = scratch;
    }

    /// Discards queued outbound bytes and any buffered inbound chunk.
    pub(crate) fn clear(&mut self) {
        self.in_flight.clear();
        self.write_queue.clear();
        self.read_scratch.clear();
    }
}
