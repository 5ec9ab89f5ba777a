//! HTTP fan-out medium for hubs in separate processes
//!
//! Each published message is posted to every configured hub URL. Hubs that
//! share a scope name form one broadcast domain.

use std::time::Duration;
use tracing::{debug, warn};

use super::BroadcastMedium;
use crate::models::{HubError, HubMessage, HubResult};

/// Header carrying the broadcast scope name
pub const SCOPE_HEADER: &str = "X-Hub-Scope";

/// Path every hub accepts federation messages on
pub const FEDERATION_PATH: &str = "/api/v1/federation/messages";

/// Broadcast medium posting to a fixed list of hubs
#[derive(Clone)]
pub struct HttpBroadcast {
    peers: Vec<String>,
    scope: String,
    http_client: reqwest::Client,
}

impl HttpBroadcast {
    /// Create a medium for `peers` (base URLs) within `scope`
    pub fn new(peers: Vec<String>, scope: impl Into<String>, timeout: Duration) -> HubResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            peers: peers
                .into_iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .collect(),
            scope: scope.into(),
            http_client,
        })
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Post one message to one hub
    pub async fn send_to(&self, peer: &str, message: &HubMessage) -> HubResult<()> {
        let url = format!("{}{}", peer, FEDERATION_PATH);

        let response = self
            .http_client
            .post(&url)
            .header(SCOPE_HEADER, &self.scope)
            .json(message)
            .send()
            .await
            .map_err(|e| HubError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HubError::FederationError(format!(
                "Hub {} rejected {}: {}",
                peer,
                message.kind(),
                response.status()
            )));
        }

        Ok(())
    }
}

impl BroadcastMedium for HttpBroadcast {
    fn publish(&self, message: HubMessage) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("BROADCAST>> no runtime, dropping {}", message.kind());
                return;
            }
        };

        for peer in &self.peers {
            let medium = self.clone();
            let peer = peer.clone();
            let message = message.clone();
            runtime.spawn(async move {
                match medium.send_to(&peer, &message).await {
                    Ok(()) => debug!("BROADCAST>> {} delivered to {}", message.kind(), peer),
                    Err(e) => warn!("BROADCAST>> {} to {} failed: {}", message.kind(), peer, e),
                }
            });
        }
    }
}

impl std::fmt::Debug for HttpBroadcast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBroadcast")
            .field("peers", &self.peers)
            .field("scope", &self.scope)
            .finish()
    }
}
