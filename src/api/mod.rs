//! HTTP API for the Frame Hub
//!
//! Peer channels, federation ingress, directory and health endpoints.

mod health;
mod responses;
mod rest;

pub use health::*;
pub use responses::*;
pub use rest::*;
