//! Inbound path: one outstanding read, re-armed after each dispatch.

use super::client::{Session, TcpClient};
use super::handler::ReceiveAction;

use bytes::BytesMut;
use tracing::{debug, warn};

impl TcpClient {
    /// Arms the first read of a session.
    pub(super) fn start_read(&self, session: &Session) {
        let scratch = self.inner().buffers.lock().lend_scratch();
        self.issue_read(session, scratch);
    }

    fn issue_read(&self, session: &Session, scratch: BytesMut) {
        let fd = session.fd();
        let epoch = session.epoch;
        let client = self.downgrade();

        debug!(fd, "starting async read");

        self.inner().reactor.async_read(
            fd,
            scratch,
            self.inner().config.read_size,
            Box::new(move |chunk, received| {
                if let Some(client) = client.upgrade() {
                    client.on_read_complete(epoch, chunk, received);
                }
            }),
        );
    }

    fn on_read_complete(&self, epoch: u64, mut chunk: BytesMut, received: usize) {
        let on_receive = match self.inner().state.read().session(epoch) {
            Some(session) => session.handlers.on_receive.clone(),
            None => {
                debug!(epoch, received, "read completed after disconnection");
                return;
            }
        };

        let start = chunk.len().saturating_sub(received);
        debug!(bytes = chunk.len() - start, "received data, calling receive handler");

        if on_receive(self, &chunk[start..]) == ReceiveAction::StopAndDisconnect {
            warn!(epoch, "receive handler requested disconnection");
            self.disconnect_session(epoch);
            return;
        }

        chunk.clear();

        let state = self.inner().state.read();
        match state.session(epoch) {
            Some(session) => self.issue_read(session, chunk),
            None => self.inner().buffers.lock().restore_scratch(chunk),
        }
    }
}
