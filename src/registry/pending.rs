//! Table of in-flight calls awaiting a correlated reply

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::debug;

use crate::models::{CallOutcome, HubError, HubResult};

/// An in-flight call
#[derive(Debug)]
pub struct PendingCall {
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    /// Target frame when the call was relayed to another hub
    pub relayed_to: Option<String>,
    resolver: oneshot::Sender<CallOutcome>,
}

/// Serializable view of a pending call
#[derive(Debug, Clone, Serialize)]
pub struct PendingCallInfo {
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relayed_to: Option<String>,
}

/// Completion handle for a dispatched call.
///
/// Completes only when a reply with the same request id arrives; there is no
/// timeout.
#[derive(Debug)]
pub struct PendingReply {
    request_id: String,
    rx: oneshot::Receiver<CallOutcome>,
}

impl PendingReply {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the correlated reply
    pub async fn wait(self) -> CallOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(HubError::Internal(format!(
                "pending call {} dropped without a reply",
                self.request_id
            ))),
        }
    }
}

/// Pending calls keyed by request id; at most one entry per id
#[derive(Debug, Default)]
pub struct PendingCallTable {
    calls: HashMap<String, PendingCall>,
}

impl PendingCallTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.calls.contains_key(request_id)
    }

    /// Record a new pending call, rejecting a request id that is still open
    pub fn insert(&mut self, request_id: &str) -> HubResult<PendingReply> {
        if self.contains(request_id) {
            return Err(HubError::duplicate_request(request_id));
        }

        let (tx, rx) = oneshot::channel();
        self.calls.insert(
            request_id.to_string(),
            PendingCall {
                request_id: request_id.to_string(),
                created_at: Utc::now(),
                relayed_to: None,
                resolver: tx,
            },
        );

        Ok(PendingReply {
            request_id: request_id.to_string(),
            rx,
        })
    }

    /// Mark a pending call as relayed to `frame_id` on another hub
    pub fn mark_relayed(&mut self, request_id: &str, frame_id: &str) {
        if let Some(call) = self.calls.get_mut(request_id) {
            call.relayed_to = Some(frame_id.to_string());
        }
    }

    /// Whether a hub reply from `frame_id` answers a call this table relayed
    pub fn awaits_relay(&self, request_id: &str, frame_id: &str) -> bool {
        self.calls
            .get(request_id)
            .and_then(|c| c.relayed_to.as_deref())
            .map_or(false, |target| target == frame_id)
    }

    /// Remove the pending call and complete it with `outcome`
    pub fn resolve(&mut self, request_id: &str, outcome: CallOutcome) -> HubResult<()> {
        let call = self
            .calls
            .remove(request_id)
            .ok_or_else(|| HubError::reply_mismatch(request_id))?;

        if call.resolver.send(outcome).is_err() {
            debug!("CALL-SERVICE-REPLY>> waiter for {} already gone", request_id);
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<PendingCallInfo> {
        let mut calls: Vec<_> = self
            .calls
            .values()
            .map(|c| PendingCallInfo {
                request_id: c.request_id.clone(),
                created_at: c.created_at,
                relayed_to: c.relayed_to.clone(),
            })
            .collect();
        calls.sort_by_key(|c| c.created_at);
        calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_resolve() {
        let mut table = PendingCallTable::new();
        let reply = table.insert("r1").unwrap();
        assert!(table.contains("r1"));

        table.resolve("r1", Ok(json!({ "ok": true }))).unwrap();
        assert!(table.is_empty());
        assert_eq!(reply.wait().await.unwrap(), json!({ "ok": true }));
    }

    #[test]
    fn test_duplicate_request_rejected() {
        let mut table = PendingCallTable::new();
        let _reply = table.insert("r1").unwrap();

        let err = table.insert("r1").unwrap_err();
        assert!(matches!(err, HubError::DuplicateRequest(ref id) if id == "r1"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_is_mismatch() {
        let mut table = PendingCallTable::new();
        let err = table.resolve("missing", Ok(json!(null))).unwrap_err();
        assert!(matches!(err, HubError::ReplyMismatch(_)));
    }

    #[tokio::test]
    async fn test_second_resolve_is_mismatch() {
        let mut table = PendingCallTable::new();
        let reply = table.insert("r1").unwrap();
        table
            .resolve("r1", Err(HubError::CallFailed("nope".into())))
            .unwrap();

        assert!(table.resolve("r1", Ok(json!(1))).is_err());
        assert_eq!(reply.wait().await.unwrap_err().to_string(), "nope");
    }

    #[test]
    fn test_request_id_reusable_after_resolution() {
        let mut table = PendingCallTable::new();
        let _first = table.insert("r1").unwrap();
        table.resolve("r1", Ok(json!(null))).unwrap();
        assert!(table.insert("r1").is_ok());
        assert_eq!(table.snapshot().len(), 1);
    }

    #[test]
    fn test_only_relayed_calls_await_hub_replies() {
        let mut table = PendingCallTable::new();
        let _local = table.insert("r1").unwrap();
        let _relayed = table.insert("r2").unwrap();
        table.mark_relayed("r2", "far:1");

        assert!(!table.awaits_relay("r1", "far:1"));
        assert!(table.awaits_relay("r2", "far:1"));
        assert!(!table.awaits_relay("r2", "other:2"));
        assert_eq!(
            table.snapshot().iter().filter(|c| c.relayed_to.is_some()).count(),
            1
        );
    }
}
