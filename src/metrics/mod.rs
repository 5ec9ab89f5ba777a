//! Metrics for the Frame Hub

mod prometheus;

pub use self::prometheus::*;
