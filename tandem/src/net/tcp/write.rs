//! Outbound path: the write queue is drained by one reactor write at a time.

use super::client::{Session, TcpClient};
use crate::error::ClientError;

use bytes::Bytes;
use tracing::{debug, error, warn};

impl TcpClient {
    /// Queues `bytes` for transmission.
    ///
    /// Bytes are transmitted in the order `send` calls append them; each call's
    /// payload stays contiguous. An empty payload is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without a live connection.
    pub fn send(&self, bytes: impl AsRef<[u8]>) -> Result<(), ClientError> {
        let bytes = bytes.as_ref();
        debug!(bytes = bytes.len(), "attempting to send data");

        let state = self.inner().state.read();
        let Some(session) = state.current() else {
            error!("not connected");
            return Err(ClientError::NotConnected);
        };

        if bytes.is_empty() {
            warn!("nothing to send");
            return Ok(());
        }

        let batch = {
            let mut buffers = self.inner().buffers.lock();

            match buffers.enqueue(bytes) {
                Some(batch) => batch,
                None => {
                    debug!(queued = buffers.queued(), "async write already in progress");
                    return Ok(());
                }
            }
        };

        self.issue_write(session, batch);
        Ok(())
    }

    /// Hands a batch to the reactor. `state` must be held so the descriptor
    /// cannot be released underneath the request.
    fn issue_write(&self, session: &Session, batch: Bytes) {
        let fd = session.fd();
        let epoch = session.epoch;
        let client = self.downgrade();

        debug!(fd, bytes = batch.len(), "starting async write");

        self.inner().reactor.async_write(
            fd,
            batch,
            Box::new(move |written| {
                if let Some(client) = client.upgrade() {
                    client.on_write_complete(epoch, written);
                }
            }),
        );
    }

    fn on_write_complete(&self, epoch: u64, written: usize) {
        let state = self.inner().state.read();
        let Some(session) = state.session(epoch) else {
            debug!(epoch, written, "write completed after disconnection");
            return;
        };

        let next = self.inner().buffers.lock().consume(written);
        debug!(fd = session.fd(), written, "wrote data, write queue trimmed");

        if let Some(next) = next {
            self.issue_write(session, next);
        }
    }
}
