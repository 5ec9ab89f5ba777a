//! Broadcast medium shared by co-located hubs

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::HubMessage;
use crate::services::Hub;

/// Publish side of the medium every hub in one scope listens on.
///
/// Delivery is best effort: a message may be lost and is never retried.
pub trait BroadcastMedium: Send + Sync {
    fn publish(&self, message: HubMessage);
}

const LOCAL_CAPACITY: usize = 1024;

/// In-process medium for hubs sharing one runtime
#[derive(Debug, Clone)]
pub struct LocalBroadcast {
    tx: broadcast::Sender<HubMessage>,
}

impl LocalBroadcast {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(LOCAL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubMessage> {
        self.tx.subscribe()
    }

    /// Feed every message on the medium into `hub`, including its own
    /// publications (the hub discards those itself).
    pub fn attach(&self, hub: Arc<Hub>) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => hub.handle_broadcast(message),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("BROADCAST>> hub {} lagged, {} messages lost", hub.id(), skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("BROADCAST>> medium closed for hub {}", hub.id());
                        break;
                    }
                }
            }
        })
    }
}

impl Default for LocalBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastMedium for LocalBroadcast {
    fn publish(&self, message: HubMessage) {
        // No receivers is not an error on a broadcast medium
        if self.tx.send(message).is_err() {
            debug!("BROADCAST>> no listeners");
        }
    }
}

/// Medium for a hub running without federation
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroadcast;

impl BroadcastMedium for NullBroadcast {
    fn publish(&self, message: HubMessage) {
        debug!("BROADCAST>> federation disabled, dropping {}", message.kind());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HubId, HubStart};

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let medium = LocalBroadcast::new();
        let mut a = medium.subscribe();
        let mut b = medium.subscribe();

        let msg = HubMessage::HubStart(HubStart {
            hub_id: HubId::from("h1"),
        });
        medium.publish(msg.clone());

        assert_eq!(a.recv().await.unwrap(), msg);
        assert_eq!(b.recv().await.unwrap(), msg);
    }

    #[test]
    fn test_publish_without_listeners_is_silent() {
        let medium = LocalBroadcast::new();
        medium.publish(HubMessage::HubStart(HubStart {
            hub_id: HubId::from("h1"),
        }));
        NullBroadcast.publish(HubMessage::HubStart(HubStart {
            hub_id: HubId::from("h1"),
        }));
    }
}
