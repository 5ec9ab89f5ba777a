//! Inbound side of the hub-to-hub protocol
//!
//! Every hub sees every federation message on the medium. Calls are answered
//! only by the hub owning the target endpoint, and replies are acted on only
//! by the hub holding the matching pending call; everyone else stays silent.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::federation::BroadcastMedium;
use crate::metrics;
use crate::models::{
    CallService, HubCallService, HubCallServiceReply, HubId, HubMessage, HubPing,
};
use crate::registry::PendingReply;
use crate::services::{Hub, RouteScope};

impl Hub {
    /// Handle one message from the broadcast medium
    pub fn handle_broadcast(&self, message: HubMessage) {
        if message.hub_id() == self.id() {
            metrics::record_self_message_dropped();
            return;
        }

        metrics::record_federation_message("in", message.kind());

        match message {
            HubMessage::HubStart(start) => {
                // Peers registered here are re-announced only on their next
                // handshake; a late joiner does not get a roster replay.
                info!("HUB-START>> hub {} joined", start.hub_id);
            }
            HubMessage::HubPing(ping) => self.handle_hub_ping(ping),
            HubMessage::HubCallService(call) => self.handle_hub_call_service(call),
            HubMessage::HubCallServiceReply(reply) => self.handle_hub_call_service_reply(reply),
        }
    }

    fn handle_hub_ping(&self, ping: HubPing) {
        let HubPing {
            hub_id,
            origin,
            entries,
        } = ping;

        let mut state = self.lock();
        for announcement in entries {
            state
                .hub_peers
                .upsert(&hub_id, &origin, announcement, self.notifier.as_ref());
        }
        Self::update_gauges(&state);
    }

    fn handle_hub_call_service(&self, relayed: HubCallService) {
        let HubCallService {
            hub_id: from_hub,
            frame_id,
            request_id,
            target_frame_id,
            service,
            payload,
            ..
        } = relayed;

        let call = CallService {
            frame_id: None,
            request_id: request_id.clone(),
            target_frame_id: Some(target_frame_id),
            service,
            ignore_quietly: true,
            payload,
        };

        let dispatched = {
            let mut state = self.lock();
            self.dispatch(&mut state, None, call, RouteScope::LocalOnly)
        };

        match dispatched {
            Ok(Some(reply)) => {
                debug!("HUB-CALL-SERVICE>> {} from {} is ours", request_id, from_hub);
                spawn_reply_to_hubs(
                    Arc::clone(&self.medium),
                    self.id.clone(),
                    frame_id,
                    reply,
                );
            }
            Ok(None) => {
                debug!("HUB-CALL-SERVICE>> {} is not for this hub", request_id);
            }
            Err(e) => {
                warn!("HUB-CALL-SERVICE>> {} from {} failed: {}", request_id, from_hub, e);
                metrics::record_call_rejected(&e.code().to_string());
                self.publish(HubMessage::HubCallServiceReply(
                    HubCallServiceReply::from_outcome(self.id.clone(), frame_id, request_id, &Err(e)),
                ));
            }
        }
    }

    fn handle_hub_call_service_reply(&self, reply: HubCallServiceReply) {
        let mut state = self.lock();
        if !state.pending.awaits_relay(&reply.request_id, &reply.frame_id) {
            // A reply to a different hub
            return;
        }

        debug!(
            "HUB-CALL-SERVICE-REPLY>> {} answered by {}",
            reply.request_id, reply.hub_id
        );
        if let Err(e) = state.pending.resolve(&reply.request_id, reply.outcome()) {
            warn!("HUB-CALL-SERVICE-REPLY>> {}", e);
        }
        Self::update_gauges(&state);
    }
}

/// Broadcast the eventual outcome of a relayed call to every hub
fn spawn_reply_to_hubs(
    medium: Arc<dyn BroadcastMedium>,
    hub_id: HubId,
    frame_id: String,
    reply: PendingReply,
) {
    tokio::spawn(async move {
        let request_id = reply.request_id().to_string();
        let outcome = reply.wait().await;
        let message = HubMessage::HubCallServiceReply(HubCallServiceReply::from_outcome(
            hub_id, frame_id, request_id, &outcome,
        ));
        metrics::record_federation_message("out", message.kind());
        medium.publish(message);
    });
}
