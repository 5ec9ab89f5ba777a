//! Hub-local registries
//!
//! Plain data structures without their own locking; the owning hub
//! serializes access to all of them through one lock.

mod endpoints;
mod hub_peers;
mod pending;

pub use endpoints::*;
pub use hub_peers::*;
pub use pending::*;
