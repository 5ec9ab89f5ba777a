//! Data models for the Frame Hub
//!
//! Wire messages, identity tokens and error types shared by every layer.

mod error;
mod identity;
mod message;

pub use error::*;
pub use identity::*;
pub use message::*;
