//! In-process peer channel backed by an unbounded mpsc queue

use tokio::sync::mpsc;

use super::ReplyChannel;
use crate::models::{HubError, HubResult, PeerMessage};

/// Peer channel whose far end is an in-process receiver
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<PeerMessage>,
}

impl MemoryChannel {
    /// Create a channel and the receiver the peer reads from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PeerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReplyChannel for MemoryChannel {
    fn post(&self, message: PeerMessage) -> HubResult<()> {
        self.tx
            .send(message)
            .map_err(|_| HubError::ChannelClosed("memory channel receiver dropped".to_string()))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pong;

    #[tokio::test]
    async fn test_post_and_receive() {
        let (channel, mut rx) = MemoryChannel::new();
        channel
            .post(PeerMessage::Pong(Pong { frame_id: "f:1".into() }))
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, PeerMessage::Pong(Pong { frame_id: "f:1".into() }));
    }

    #[test]
    fn test_post_after_drop_fails() {
        let (channel, rx) = MemoryChannel::new();
        drop(rx);
        let err = channel.post(PeerMessage::ListServices).unwrap_err();
        assert!(matches!(err, HubError::ChannelClosed(_)));
    }
}
