//! Registry of directly reachable peers

use tracing::info;

use crate::channel::{EntryId, Notifier, ReplyHandle};
use crate::models::{generate_token, ServiceEntry};

/// A peer reachable through a point-to-point channel
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub channel: ReplyHandle,
    pub frame_id: String,
    pub origin: String,
    pub services: Option<Vec<String>>,
    pub entry: EntryId,
}

impl Endpoint {
    /// Directory projection without the reply capability
    pub fn to_entry(&self) -> ServiceEntry {
        ServiceEntry {
            frame_id: self.frame_id.clone(),
            origin: self.origin.clone(),
            services: self.services.clone(),
            hub_id: None,
        }
    }

    fn roster_text(&self) -> String {
        roster_text(&self.origin, &self.frame_id, self.services.as_deref())
    }
}

pub(crate) fn roster_text(origin: &str, frame_id: &str, services: Option<&[String]>) -> String {
    match services {
        Some(s) if !s.is_empty() => format!("{} #{} [{}]", origin, frame_id, s.join(", ")),
        _ => format!("{} #{}", origin, frame_id),
    }
}

/// Outcome of a registration handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// First handshake from this channel
    Created {
        frame_id: String,
        services: Option<Vec<String>>,
    },
    /// Repeated handshake from an already registered channel
    Refreshed { frame_id: String },
}

impl Registration {
    pub fn frame_id(&self) -> &str {
        match self {
            Registration::Created { frame_id, .. } => frame_id,
            Registration::Refreshed { frame_id } => frame_id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Registration::Created { .. })
    }
}

/// Endpoints keyed by channel identity, in registration order
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel, or refresh the endpoint already bound to it.
    ///
    /// Repeated handshakes from the same channel never create a second
    /// endpoint; they only replace `services` when a value is supplied.
    pub fn register(
        &mut self,
        channel: &ReplyHandle,
        origin: &str,
        services: Option<Vec<String>>,
        notifier: &dyn Notifier,
    ) -> Registration {
        if let Some(existing) = self
            .endpoints
            .iter_mut()
            .find(|e| e.channel.same_channel(channel))
        {
            info!(
                "PING>> already registered {} {:?} -> {:?}",
                existing.frame_id, existing.services, services
            );

            if let Some(services) = services {
                existing.services = Some(services);
                notifier.update_entry(existing.entry, &existing.roster_text());
            }

            return Registration::Refreshed {
                frame_id: existing.frame_id.clone(),
            };
        }

        let frame_id = self.unique_frame_id();
        let entry = notifier.add_entry(&roster_text(origin, &frame_id, services.as_deref()));

        let endpoint = Endpoint {
            channel: channel.clone(),
            frame_id: frame_id.clone(),
            origin: origin.to_string(),
            services: services.clone(),
            entry,
        };

        info!("PING>> new registration {} from {}", frame_id, origin);
        self.endpoints.push(endpoint);

        Registration::Created { frame_id, services }
    }

    fn unique_frame_id(&self) -> String {
        loop {
            let candidate = generate_token();
            if self.find_by_frame_id(&candidate).is_none() {
                return candidate;
            }
        }
    }

    pub fn find_by_channel(&self, channel: &ReplyHandle) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.channel.same_channel(channel))
    }

    pub fn find_by_frame_id(&self, frame_id: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.frame_id == frame_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = ServiceEntry> + '_ {
        self.endpoints.iter().map(Endpoint::to_entry)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryChannel, RosterNotifier};

    fn handle() -> ReplyHandle {
        let (channel, _rx) = MemoryChannel::new();
        ReplyHandle::new(channel)
    }

    #[test]
    fn test_register_is_idempotent_per_channel() {
        let mut registry = EndpointRegistry::new();
        let roster = RosterNotifier::new();
        let channel = handle();

        let first = registry.register(&channel, "https://a.example", None, &roster);
        let second = registry.register(&channel, "https://a.example", None, &roster);

        assert!(first.is_new());
        assert!(!second.is_new());
        assert_eq!(first.frame_id(), second.frame_id());
        assert_eq!(registry.len(), 1);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_repeat_handshake_updates_services() {
        let mut registry = EndpointRegistry::new();
        let roster = RosterNotifier::new();
        let channel = handle();

        let reg = registry.register(&channel, "https://a.example", None, &roster);
        registry.register(
            &channel,
            "https://a.example",
            Some(vec!["search".into()]),
            &roster,
        );
        // A retry without services keeps the previous declaration
        registry.register(&channel, "https://a.example", None, &roster);

        let endpoint = registry.find_by_frame_id(reg.frame_id()).unwrap();
        assert_eq!(endpoint.services, Some(vec!["search".to_string()]));
        assert!(roster.entries()[0].text.ends_with("[search]"));
    }

    #[test]
    fn test_origin_is_kept_from_first_handshake() {
        let mut registry = EndpointRegistry::new();
        let roster = RosterNotifier::new();
        let channel = handle();

        registry.register(&channel, "https://a.example", None, &roster);
        registry.register(&channel, "https://evil.example", None, &roster);

        assert_eq!(
            registry.find_by_channel(&channel).unwrap().origin,
            "https://a.example"
        );
    }

    #[test]
    fn test_distinct_channels_get_distinct_frame_ids() {
        let mut registry = EndpointRegistry::new();
        let roster = RosterNotifier::new();

        let a = registry.register(&handle(), "https://a.example", None, &roster);
        let b = registry.register(&handle(), "https://a.example", None, &roster);

        assert_ne!(a.frame_id(), b.frame_id());
        assert_eq!(registry.entries().count(), 2);
    }
}
