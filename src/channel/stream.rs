//! Server-sent-event peer channels for the HTTP surface
//!
//! A peer opens a stream and receives a channel id as the first event. It then
//! posts its own messages against that id; the hub answers on the stream.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::{ReplyChannel, ReplyHandle};
use crate::models::{HubError, HubResult, PeerMessage};

/// Peer channel whose far end is an open event stream
#[derive(Debug)]
pub struct StreamChannel {
    id: Uuid,
    tx: mpsc::UnboundedSender<PeerMessage>,
}

impl StreamChannel {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ReplyChannel for StreamChannel {
    fn post(&self, message: PeerMessage) -> HubResult<()> {
        self.tx
            .send(message)
            .map_err(|_| HubError::ChannelClosed(format!("stream {} closed", self.id)))
    }

    fn describe(&self) -> String {
        format!("stream:{}", self.id)
    }
}

/// Open stream channels by id
#[derive(Debug, Clone, Default)]
pub struct ChannelTable {
    channels: Arc<RwLock<HashMap<Uuid, Arc<StreamChannel>>>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new channel, returning its id and the stream side
    pub fn open(&self) -> (Uuid, mpsc::UnboundedReceiver<PeerMessage>) {
        self.prune_closed();

        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.channels
            .write()
            .insert(id, Arc::new(StreamChannel { id, tx }));

        debug!("CHANNEL>> opened {}", id);
        (id, rx)
    }

    /// Reply capability for an open channel; the same allocation is handed
    /// out every time so identity comparison stays stable
    pub fn get(&self, id: &Uuid) -> Option<ReplyHandle> {
        self.channels
            .read()
            .get(id)
            .map(|c| ReplyHandle::from_arc(Arc::clone(c) as Arc<dyn ReplyChannel>))
    }

    /// Drop channels whose stream side has gone away
    pub fn prune_closed(&self) -> usize {
        let mut channels = self.channels.write();
        let before = channels.len();
        channels.retain(|_, c| !c.is_closed());
        before - channels.len()
    }

    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }
}

/// Encode one server-sent-event frame
pub fn sse_frame(event: Option<&str>, data: &str) -> String {
    let mut frame = String::new();
    if let Some(event) = event {
        frame.push_str("event: ");
        frame.push_str(event);
        frame.push('\n');
    }
    for line in data.lines() {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}
