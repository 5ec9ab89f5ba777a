//! Hub services: registration, directory, dispatch and call routing

mod hub;
mod routing;

pub use hub::*;
pub(crate) use routing::RouteScope;
