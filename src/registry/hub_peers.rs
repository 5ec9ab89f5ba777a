//! Registry of peers known only through other hubs

use tracing::info;

use super::endpoints::roster_text;
use crate::channel::{EntryId, Notifier};
use crate::models::{HubId, PeerAnnouncement, ServiceEntry};

/// A peer announced by another hub; not directly reachable
#[derive(Debug, Clone, PartialEq)]
pub struct HubPeerEndpoint {
    pub hub_id: HubId,
    pub frame_id: String,
    pub origin: String,
    pub services: Option<Vec<String>>,
    pub entry: EntryId,
}

impl HubPeerEndpoint {
    pub fn to_entry(&self) -> ServiceEntry {
        ServiceEntry {
            frame_id: self.frame_id.clone(),
            origin: self.origin.clone(),
            services: self.services.clone(),
            hub_id: Some(self.hub_id.clone()),
        }
    }
}

/// Result of applying one announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Refreshed,
}

/// Hub peers keyed by `(origin, frame_id)`; entries are never expired
#[derive(Debug, Default)]
pub struct HubPeerRegistry {
    peers: Vec<HubPeerEndpoint>,
}

impl HubPeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an announced peer or refresh its services
    pub fn upsert(
        &mut self,
        hub_id: &HubId,
        origin: &str,
        announcement: PeerAnnouncement,
        notifier: &dyn Notifier,
    ) -> Upsert {
        let PeerAnnouncement { frame_id, services } = announcement;

        if let Some(existing) = self
            .peers
            .iter_mut()
            .find(|p| p.origin == origin && p.frame_id == frame_id)
        {
            info!(
                "HUB-PING>> already registered {} {:?} -> {:?}",
                existing.frame_id, existing.services, services
            );
            if let Some(services) = services {
                existing.services = Some(services);
                notifier.update_entry(existing.entry, &hub_roster_text(existing));
            }
            return Upsert::Refreshed;
        }

        let text = format!("{} (hub)", roster_text(origin, &frame_id, services.as_deref()));
        let entry = notifier.add_entry(&text);

        info!("HUB-PING>> new registration {} via {}", frame_id, hub_id);
        self.peers.push(HubPeerEndpoint {
            hub_id: hub_id.clone(),
            frame_id,
            origin: origin.to_string(),
            services,
            entry,
        });

        Upsert::Added
    }

    pub fn find_by_frame_id(&self, frame_id: &str) -> Option<&HubPeerEndpoint> {
        self.peers.iter().find(|p| p.frame_id == frame_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = ServiceEntry> + '_ {
        self.peers.iter().map(HubPeerEndpoint::to_entry)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

fn hub_roster_text(peer: &HubPeerEndpoint) -> String {
    format!(
        "{} (hub)",
        roster_text(&peer.origin, &peer.frame_id, peer.services.as_deref())
    )
}
