//! API module
//!
//! HTTP endpoints, middleware and the router registry.

pub mod extract;
pub mod middleware;
pub mod registry;
pub mod routes;

pub use extract::{BodyError, BodyLimits, ParsedBody, Payload};
pub use registry::{RegistryError, RouterRegistry, SubRouter};

/// Prefix the router registry is mounted under
pub const API_PREFIX: &str = "/api";

/// Registry with every sub-router the service ships.
///
/// Auth and order routers are not written yet; mount them here when they are.
pub fn create_registry() -> Result<RouterRegistry, RegistryError> {
    Ok(RouterRegistry::new())
}
