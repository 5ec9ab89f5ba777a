//! The hub: registration handshake, directory and peer message dispatch
//!
//! All registry state lives behind one lock. Every handler takes the lock
//! for its whole synchronous body, so handlers never interleave; the only
//! suspension point is waiting for a correlated reply, which happens in a
//! spawned task outside the lock.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::channel::{Notifier, ReplyHandle};
use crate::federation::BroadcastMedium;
use crate::metrics;
use crate::models::{
    CallServiceReply, HubError, HubId, HubMessage, HubPing, HubStart, PeerAnnouncement,
    PeerMessage, Pong, ServiceEntry, ServiceList,
};
use crate::registry::{
    EndpointRegistry, HubPeerRegistry, PendingCallInfo, PendingCallTable, PendingReply,
    Registration,
};

/// Registries owned by one hub
#[derive(Debug, Default)]
pub(crate) struct HubState {
    pub(crate) endpoints: EndpointRegistry,
    pub(crate) hub_peers: HubPeerRegistry,
    pub(crate) pending: PendingCallTable,
}

/// Snapshot of registry sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HubStats {
    pub endpoints: usize,
    pub hub_peers: usize,
    pub pending_calls: usize,
}

/// One hub instance; create one per process and share it behind an `Arc`
pub struct Hub {
    pub(crate) id: HubId,
    pub(crate) state: Mutex<HubState>,
    pub(crate) medium: Arc<dyn BroadcastMedium>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl Hub {
    /// Create a hub with a freshly generated identity
    pub fn new(medium: Arc<dyn BroadcastMedium>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Self::with_id(HubId::generate(), medium, notifier)
    }

    pub fn with_id(
        id: HubId,
        medium: Arc<dyn BroadcastMedium>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(HubState::default()),
            medium,
            notifier,
        })
    }

    pub fn id(&self) -> &HubId {
        &self.id
    }

    /// Announce this hub on the medium.
    ///
    /// Other hubs do not answer with their roster; peers registered elsewhere
    /// become visible only through their next `hub-ping`.
    pub fn start(&self) {
        info!("HUB>> starting {}", self.id);
        self.publish(HubMessage::HubStart(HubStart {
            hub_id: self.id.clone(),
        }));
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock()
    }

    pub(crate) fn publish(&self, message: HubMessage) {
        metrics::record_federation_message("out", message.kind());
        self.medium.publish(message);
    }

    pub(crate) fn update_gauges(state: &HubState) {
        metrics::set_registry_sizes(
            state.endpoints.len(),
            state.hub_peers.len(),
            state.pending.len(),
        );
    }

    // ========================================================================
    // Registration & directory
    // ========================================================================

    /// Registration handshake; returns the frame id bound to `channel`.
    ///
    /// Safe to call repeatedly from the same channel: only the first call
    /// creates an endpoint and announces it to other hubs.
    pub fn register(
        &self,
        channel: &ReplyHandle,
        origin: &str,
        services: Option<Vec<String>>,
    ) -> String {
        let registration = {
            let mut state = self.lock();
            let registration =
                state
                    .endpoints
                    .register(channel, origin, services, self.notifier.as_ref());
            Self::update_gauges(&state);
            registration
        };

        if let Registration::Created { frame_id, services } = &registration {
            self.publish(HubMessage::HubPing(HubPing {
                hub_id: self.id.clone(),
                origin: origin.to_string(),
                entries: vec![PeerAnnouncement {
                    frame_id: frame_id.clone(),
                    services: services.clone(),
                }],
            }));
        }

        registration.frame_id().to_string()
    }

    /// Directory of local endpoints followed by hub peers
    pub fn list_services(&self) -> Vec<ServiceEntry> {
        let state = self.lock();
        state
            .endpoints
            .entries()
            .chain(state.hub_peers.entries())
            .collect()
    }

    pub fn is_registered(&self, channel: &ReplyHandle) -> bool {
        self.lock().endpoints.find_by_channel(channel).is_some()
    }

    pub fn stats(&self) -> HubStats {
        let state = self.lock();
        HubStats {
            endpoints: state.endpoints.len(),
            hub_peers: state.hub_peers.len(),
            pending_calls: state.pending.len(),
        }
    }

    pub fn pending_calls(&self) -> Vec<PendingCallInfo> {
        self.lock().pending.snapshot()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Handle one message from a peer channel.
    ///
    /// Failures never escape: they are answered with a structured failure
    /// reply, or dropped when the sender has not completed the handshake.
    pub fn handle_message(&self, source: &ReplyHandle, origin: &str, message: PeerMessage) {
        debug!("MESSAGE>> {} from {}", message.kind(), origin);

        match message {
            PeerMessage::Ping(ping) => {
                let frame_id = self.register(source, origin, ping.services);
                if let Err(e) = source.post(PeerMessage::Pong(Pong { frame_id })) {
                    warn!("PING>> pong not delivered: {}", e);
                }
            }

            PeerMessage::ListServices => {
                let entries = self.list_services();
                self.respond(source, PeerMessage::ServiceList(ServiceList { entries }));
            }

            PeerMessage::CallService(call) => {
                let request_id = call.request_id.clone();
                match self.call_service(source, call) {
                    Ok(Some(reply)) => spawn_reply_to_peer(source.clone(), reply),
                    Ok(None) => debug!("CALL-SERVICE>> no response for {}", request_id),
                    Err(e) => self.reject(source, &request_id, e),
                }
            }

            PeerMessage::CallServiceReply(reply) => {
                let request_id = reply.request_id.clone();
                if let Err(e) = self.handle_reply(reply) {
                    self.reject(source, &request_id, e);
                }
            }

            PeerMessage::Pong(_) | PeerMessage::ServiceList(_) => {
                debug!("MESSAGE>> ignoring hub-bound {} from peer", origin);
            }
        }
    }

    /// Correlate a reply from a target peer with its pending call
    pub fn handle_reply(&self, reply: CallServiceReply) -> Result<(), HubError> {
        let mut state = self.lock();
        let result = state.pending.resolve(&reply.request_id, reply.outcome());
        Self::update_gauges(&state);

        if result.is_err() {
            info!("CALL-SERVICE-REPLY>> unknown requestId {}", reply.request_id);
        }
        result
    }

    /// Send a non-registration response, only to registered senders
    fn respond(&self, source: &ReplyHandle, message: PeerMessage) {
        if !self.is_registered(source) {
            info!("MESSAGE>> source is not registered, dropping {}", message.kind());
            return;
        }
        if let Err(e) = source.post(message) {
            warn!("MESSAGE>> response not delivered: {}", e);
        }
    }

    fn reject(&self, source: &ReplyHandle, request_id: &str, error: HubError) {
        let code = error.code();
        metrics::record_call_rejected(&code.to_string());
        info!("CALL-SERVICE>> {} rejected: {}", request_id, error);
        self.respond(
            source,
            PeerMessage::CallServiceReply(CallServiceReply::failure(request_id, &error)),
        );
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").field("id", &self.id).finish()
    }
}

/// Deliver the eventual outcome of a call to the peer that made it
fn spawn_reply_to_peer(caller: ReplyHandle, reply: PendingReply) {
    tokio::spawn(async move {
        let request_id = reply.request_id().to_string();
        let outcome = reply.wait().await;
        let message = CallServiceReply::from_outcome(request_id.as_str(), &outcome);
        if let Err(e) = caller.post(PeerMessage::CallServiceReply(message)) {
            warn!("CALL-SERVICE>> reply for {} not delivered: {}", request_id, e);
        }
    });
}
