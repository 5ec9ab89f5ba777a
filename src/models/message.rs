//! Wire messages exchanged with peers and between hubs
//!
//! Every message is a JSON object with a `type` tag. Peer traffic travels on
//! a point-to-point channel and parses into [`PeerMessage`]; hub-to-hub
//! traffic travels on the broadcast medium and parses into [`HubMessage`].
//! Anything with an unknown tag fails to parse and never reaches a handler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ErrorCode, HubError, HubId};

/// Free-form call arguments carried next to the routing fields
pub type Payload = Map<String, Value>;

/// Messages on a point-to-point peer channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PeerMessage {
    /// Registration handshake, retried by the peer until it sees a pong
    Ping(Ping),
    Pong(Pong),
    ListServices,
    ServiceList(ServiceList),
    CallService(CallService),
    CallServiceReply(CallServiceReply),
}

impl PeerMessage {
    /// Tag name as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::Ping(_) => "ping",
            PeerMessage::Pong(_) => "pong",
            PeerMessage::ListServices => "list-services",
            PeerMessage::ServiceList(_) => "service-list",
            PeerMessage::CallService(_) => "call-service",
            PeerMessage::CallServiceReply(_) => "call-service-reply",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pong {
    pub frame_id: String,
}

/// Directory entry, projected without any reply capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub frame_id: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    /// Set when the entry is known only through another hub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<HubId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceList {
    pub entries: Vec<ServiceEntry>,
}

/// A service invocation, either peer to hub or hub to the target peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallService {
    /// Calling frame when forwarded by the hub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_frame_id: Option<String>,
    pub service: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_quietly: bool,
    #[serde(flatten)]
    pub payload: Payload,
}

impl CallService {
    pub fn new(
        request_id: impl Into<String>,
        target_frame_id: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            frame_id: None,
            request_id: request_id.into(),
            target_frame_id: Some(target_frame_id.into()),
            service: service.into(),
            ignore_quietly: false,
            payload: Payload::new(),
        }
    }

    pub fn ignore_quietly(mut self) -> Self {
        self.ignore_quietly = true;
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallServiceReply {
    pub request_id: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl CallServiceReply {
    pub fn success(request_id: impl Into<String>, result: Value) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            result: Some(result),
            error: None,
            code: None,
        }
    }

    pub fn failure(request_id: impl Into<String>, error: &HubError) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            result: None,
            error: Some(error.to_string()),
            code: Some(error.code()),
        }
    }

    pub fn from_outcome(request_id: impl Into<String>, outcome: &CallOutcome) -> Self {
        match outcome {
            Ok(value) => Self::success(request_id, value.clone()),
            Err(e) => Self::failure(request_id, e),
        }
    }

    /// Outcome this reply resolves a pending call with
    pub fn outcome(&self) -> CallOutcome {
        outcome_of(self.success, self.result.as_ref(), self.error.as_deref(), self.code)
    }
}

/// Result of a correlated call
pub type CallOutcome = Result<Value, HubError>;

fn outcome_of(
    success: bool,
    result: Option<&Value>,
    error: Option<&str>,
    code: Option<ErrorCode>,
) -> CallOutcome {
    if success {
        return Ok(result.cloned().unwrap_or(Value::Null));
    }

    let message = error.unwrap_or("call failed").to_string();
    match code {
        Some(code) => Err(HubError::Remote { code, message }),
        None => Err(HubError::CallFailed(message)),
    }
}

/// Messages on the broadcast medium shared by hubs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HubMessage {
    HubStart(HubStart),
    HubPing(HubPing),
    HubCallService(HubCallService),
    HubCallServiceReply(HubCallServiceReply),
}

impl HubMessage {
    /// Identity of the hub that published this message
    pub fn hub_id(&self) -> &HubId {
        match self {
            HubMessage::HubStart(m) => &m.hub_id,
            HubMessage::HubPing(m) => &m.hub_id,
            HubMessage::HubCallService(m) => &m.hub_id,
            HubMessage::HubCallServiceReply(m) => &m.hub_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HubMessage::HubStart(_) => "hub-start",
            HubMessage::HubPing(_) => "hub-ping",
            HubMessage::HubCallService(_) => "hub-call-service",
            HubMessage::HubCallServiceReply(_) => "hub-call-service-reply",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStart {
    pub hub_id: HubId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerAnnouncement {
    pub frame_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubPing {
    pub hub_id: HubId,
    pub origin: String,
    #[serde(default)]
    pub entries: Vec<PeerAnnouncement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubCallService {
    pub hub_id: HubId,
    pub frame_id: String,
    pub request_id: String,
    pub target_frame_id: String,
    pub service: String,
    /// Hubs that do not own the target stay silent
    #[serde(default = "default_true")]
    pub ignore_quietly: bool,
    #[serde(flatten)]
    pub payload: Payload,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubCallServiceReply {
    pub hub_id: HubId,
    pub frame_id: String,
    pub request_id: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl HubCallServiceReply {
    pub fn from_outcome(
        hub_id: HubId,
        frame_id: impl Into<String>,
        request_id: impl Into<String>,
        outcome: &CallOutcome,
    ) -> Self {
        let reply = CallServiceReply::from_outcome(request_id, outcome);
        Self {
            hub_id,
            frame_id: frame_id.into(),
            request_id: reply.request_id,
            success: reply.success,
            result: reply.result,
            error: reply.error,
            code: reply.code,
        }
    }

    pub fn outcome(&self) -> CallOutcome {
        outcome_of(self.success, self.result.as_ref(), self.error.as_deref(), self.code)
    }
}
