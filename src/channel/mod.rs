//! Point-to-point peer channels and the roster notifier
//!
//! A registered peer is reachable only through the [`ReplyHandle`] stored at
//! registration time. Handles are write-only and compared by identity.

mod memory;
mod notifier;
mod stream;

pub use memory::*;
pub use notifier::*;
pub use stream::*;

use std::sync::Arc;

use crate::models::{HubResult, PeerMessage};

/// Write side of a point-to-point channel to one peer
pub trait ReplyChannel: Send + Sync {
    /// Deliver a message to the peer, best effort
    fn post(&self, message: PeerMessage) -> HubResult<()>;

    /// Short description for logs
    fn describe(&self) -> String {
        "channel".to_string()
    }
}

/// Opaque reply capability for one peer
#[derive(Clone)]
pub struct ReplyHandle(Arc<dyn ReplyChannel>);

impl ReplyHandle {
    pub fn new<C: ReplyChannel + 'static>(channel: C) -> Self {
        Self(Arc::new(channel))
    }

    pub fn from_arc(channel: Arc<dyn ReplyChannel>) -> Self {
        Self(channel)
    }

    pub fn post(&self, message: PeerMessage) -> HubResult<()> {
        self.0.post(message)
    }

    /// True when both handles refer to the same underlying channel
    pub fn same_channel(&self, other: &ReplyHandle) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl std::fmt::Debug for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReplyHandle").field(&self.0.describe()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_identity() {
        let (channel, _rx) = MemoryChannel::new();
        let a = ReplyHandle::new(channel);
        let b = a.clone();
        let (other, _rx2) = MemoryChannel::new();
        let c = ReplyHandle::new(other);

        assert!(a.same_channel(&b));
        assert!(!a.same_channel(&c));
    }
}
