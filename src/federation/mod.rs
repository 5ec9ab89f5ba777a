//! Hub-to-hub federation
//!
//! Peer discovery relay and call/reply fan-out over a broadcast medium.

mod client;
mod handler;
mod medium;

pub use client::*;
pub use medium::*;
