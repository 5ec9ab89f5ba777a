//! Human-visible roster of registered peers

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Handle to one roster line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

/// External display collaborator notified on registration and discovery
pub trait Notifier: Send + Sync {
    /// Append a roster line and return its handle
    fn add_entry(&self, text: &str) -> EntryId;

    /// Replace the text of an existing line
    fn update_entry(&self, entry: EntryId, text: &str);
}

/// One roster line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub id: EntryId,
    pub text: String,
}

/// Notifier that keeps the roster in memory and logs every change
#[derive(Debug, Clone, Default)]
pub struct RosterNotifier {
    entries: Arc<RwLock<Vec<RosterEntry>>>,
}

impl RosterNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the roster in insertion order
    pub fn entries(&self) -> Vec<RosterEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Notifier for RosterNotifier {
    fn add_entry(&self, text: &str) -> EntryId {
        let mut entries = self.entries.write();
        let id = EntryId(entries.len() as u64);
        entries.push(RosterEntry {
            id,
            text: text.to_string(),
        });
        info!("ROSTER>> {}", text);
        id
    }

    fn update_entry(&self, entry: EntryId, text: &str) {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.iter_mut().find(|e| e.id == entry) {
            existing.text = text.to_string();
            info!("ROSTER>> updated {}", text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_update() {
        let roster = RosterNotifier::new();
        assert!(roster.is_empty());

        let first = roster.add_entry("https://a.example #abc:1");
        let second = roster.add_entry("https://b.example #def:2 (hub)");
        assert_ne!(first, second);

        roster.update_entry(first, "https://a.example #abc:1 [search]");
        let entries = roster.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "https://a.example #abc:1 [search]");
        assert_eq!(entries[1].text, "https://b.example #def:2 (hub)");
    }

    #[test]
    fn test_update_unknown_entry_is_ignored() {
        let roster = RosterNotifier::new();
        roster.update_entry(EntryId(7), "ghost");
        assert!(roster.is_empty());
    }
}
