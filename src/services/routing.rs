//! Call routing: resolve a target frame and forward the call

use tracing::{debug, info};

use super::hub::{Hub, HubState};
use crate::channel::ReplyHandle;
use crate::metrics;
use crate::models::{CallService, HubCallService, HubError, HubMessage, HubResult, PeerMessage};
use crate::registry::PendingReply;

/// Which registries a call may be routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteScope {
    /// Local endpoints, then peers known through other hubs
    Any,
    /// Local endpoints only; used for calls relayed by another hub so they
    /// are never relayed again
    LocalOnly,
}

enum Route {
    Local(ReplyHandle),
    Federated(String),
}

impl Hub {
    /// Dispatch a call from a registered peer.
    ///
    /// Returns `Ok(None)` when the target is unknown and the caller asked to
    /// be ignored quietly; otherwise a handle completed by the reply.
    pub fn call_service(
        &self,
        caller: &ReplyHandle,
        call: CallService,
    ) -> HubResult<Option<PendingReply>> {
        let mut state = self.lock();

        let from_frame = match state.endpoints.find_by_channel(caller) {
            Some(endpoint) => endpoint.frame_id.clone(),
            None => {
                info!("CALL-SERVICE>> message.source is not registered");
                return Err(HubError::NotRegistered);
            }
        };

        self.dispatch(&mut state, Some(from_frame), call, RouteScope::Any)
    }

    pub(crate) fn dispatch(
        &self,
        state: &mut HubState,
        from_frame: Option<String>,
        call: CallService,
        scope: RouteScope,
    ) -> HubResult<Option<PendingReply>> {
        let target = call.target_frame_id.clone().unwrap_or_default();

        // Only the hub owning the target answers a relayed call
        if scope == RouteScope::LocalOnly && state.endpoints.find_by_frame_id(&target).is_none() {
            debug!("CALL-SERVICE>> relayed call for {} is not ours", target);
            return Ok(None);
        }

        if state.pending.contains(&call.request_id) {
            info!("CALL-SERVICE>> duplicate requestId {}", call.request_id);
            return Err(HubError::duplicate_request(&call.request_id));
        }

        let route = if let Some(endpoint) = state.endpoints.find_by_frame_id(&target) {
            Route::Local(endpoint.channel.clone())
        } else if let Some(peer) = state
            .hub_peers
            .find_by_frame_id(&target)
            .filter(|_| scope == RouteScope::Any)
        {
            Route::Federated(peer.frame_id.clone())
        } else if call.ignore_quietly {
            debug!("CALL-SERVICE>> ignoring call for unknown {}", target);
            return Ok(None);
        } else {
            info!("CALL-SERVICE>> unknown to frameId {}", target);
            return Err(HubError::unknown_target(target));
        };

        let CallService {
            request_id,
            service,
            payload,
            ..
        } = call;

        let reply = state.pending.insert(&request_id)?;

        match route {
            Route::Local(channel) => {
                metrics::record_call_dispatched("local");
                let forwarded = CallService {
                    frame_id: from_frame,
                    request_id: request_id.clone(),
                    target_frame_id: Some(target),
                    service,
                    ignore_quietly: false,
                    payload,
                };
                if let Err(e) = channel.post(PeerMessage::CallService(forwarded)) {
                    // The waiter sees the delivery failure as the call outcome
                    state.pending.resolve(&request_id, Err(e))?;
                }
            }
            Route::Federated(frame_id) => {
                metrics::record_call_dispatched("federated");
                state.pending.mark_relayed(&request_id, &frame_id);
                self.publish(HubMessage::HubCallService(HubCallService {
                    hub_id: self.id.clone(),
                    frame_id,
                    request_id,
                    target_frame_id: target,
                    service,
                    ignore_quietly: true,
                    payload,
                }));
            }
        }

        Self::update_gauges(state);
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryChannel, RosterNotifier};
    use crate::federation::LocalBroadcast;
    use crate::models::{HubId, HubPing, PeerAnnouncement};
    use std::sync::Arc;

    fn hub_with_medium() -> (Arc<Hub>, LocalBroadcast) {
        let medium = LocalBroadcast::new();
        let hub = Hub::with_id(
            HubId::from("h-local"),
            Arc::new(medium.clone()),
            Arc::new(RosterNotifier::new()),
        );
        (hub, medium)
    }

    fn remote_peer(hub: &Hub, frame_id: &str) {
        hub.handle_broadcast(HubMessage::HubPing(HubPing {
            hub_id: HubId::from("h-remote"),
            origin: "https://remote.example".into(),
            entries: vec![PeerAnnouncement {
                frame_id: frame_id.into(),
                services: None,
            }],
        }));
    }

    #[test]
    fn test_not_registered_caller() {
        let (hub, _medium) = hub_with_medium();
        let (channel, _rx) = MemoryChannel::new();

        let err = hub
            .call_service(&ReplyHandle::new(channel), CallService::new("r", "t", "s"))
            .unwrap_err();
        assert!(matches!(err, HubError::NotRegistered));
    }

    #[test]
    fn test_federated_target_is_republished() {
        let (hub, medium) = hub_with_medium();
        let mut bus = medium.subscribe();
        remote_peer(&hub, "far:12345");

        let (channel, _rx) = MemoryChannel::new();
        let caller = ReplyHandle::new(channel);
        hub.register(&caller, "https://a.example", None);
        // Drain the caller's own hub-ping
        assert!(matches!(bus.try_recv(), Ok(HubMessage::HubPing(_))));

        let pending = hub
            .call_service(&caller, CallService::new("fed-1", "far:12345", "echo"))
            .unwrap();
        assert!(pending.is_some());
        assert_eq!(hub.stats().pending_calls, 1);

        let Ok(HubMessage::HubCallService(relayed)) = bus.try_recv() else {
            panic!("expected hub-call-service");
        };
        assert_eq!(relayed.hub_id.as_str(), "h-local");
        assert_eq!(relayed.request_id, "fed-1");
        assert_eq!(relayed.target_frame_id, "far:12345");
        assert!(relayed.ignore_quietly);
    }

    #[test]
    fn test_local_only_scope_skips_hub_peers() {
        let (hub, _medium) = hub_with_medium();
        remote_peer(&hub, "far:12345");

        let mut state = hub.lock();
        let result = hub
            .dispatch(
                &mut state,
                None,
                CallService::new("relay", "far:12345", "echo").ignore_quietly(),
                RouteScope::LocalOnly,
            )
            .unwrap();
        assert!(result.is_none());
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_local_only_scope_ignores_foreign_duplicate() {
        let (hub, _medium) = hub_with_medium();
        let mut state = hub.lock();
        let _own = state.pending.insert("1").unwrap();

        let result = hub
            .dispatch(
                &mut state,
                None,
                CallService::new("1", "elsewhere:00001", "echo").ignore_quietly(),
                RouteScope::LocalOnly,
            )
            .unwrap();
        assert!(result.is_none());
        assert!(state.pending.contains("1"));
    }
}
