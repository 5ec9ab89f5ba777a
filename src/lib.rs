//! Frame Hub - Peer Discovery and Call Relay Hub
//!
//! A Rust-based hub that lets independent peers discover each other and
//! invoke each other's named services, providing:
//! - Endpoint registration over point-to-point peer channels
//! - A service directory spanning local and federated endpoints
//! - Request/response call routing with duplicate suppression
//! - Hub-to-hub federation over a shared broadcast medium

pub mod config;
pub mod models;
pub mod channel;
pub mod registry;
pub mod services;
pub mod federation;
pub mod api;
pub mod metrics;

// Re-export commonly used types
pub use config::Settings;
pub use models::{CallService, CallServiceReply, HubError, HubId, HubMessage, HubResult, PeerMessage};
pub use channel::{ReplyChannel, ReplyHandle, RosterNotifier};
pub use services::Hub;
pub use federation::{BroadcastMedium, HttpBroadcast, LocalBroadcast, NullBroadcast};

/// Version of the frame-hub
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
