use super::client::TcpClient;

use std::sync::Arc;

/// What the read pump does after a chunk has been dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveAction {
    /// Keep reading.
    Continue,

    /// Stop reading and disconnect locally. The disconnection handler is not
    /// invoked.
    StopAndDisconnect,
}

impl From<bool> for ReceiveAction {
    /// `true` continues, `false` stops and disconnects.
    fn from(keep_reading: bool) -> Self {
        if keep_reading {
            ReceiveAction::Continue
        } else {
            ReceiveAction::StopAndDisconnect
        }
    }
}

/// Callback receiving every inbound chunk.
pub(crate) type ReceiveHandler = Arc<dyn Fn(&TcpClient, &[u8]) -> ReceiveAction + Send + Sync>;

/// Callback notified of involuntary disconnection.
pub(crate) type DisconnectionHandler = Arc<dyn Fn(&TcpClient) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::ReceiveAction;

    #[test]
    fn test_receive_action_from_bool() {
        assert_eq!(ReceiveAction::from(true), ReceiveAction::Continue);
        assert_eq!(ReceiveAction::from(false), ReceiveAction::StopAndDisconnect);
    }
}
