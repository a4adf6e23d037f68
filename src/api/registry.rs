//! Router registry
//!
//! Maps path prefixes to independently implemented sub-routers. The registry
//! answers `GET /health` itself; everything else under its mount point goes to
//! whichever sub-router owns the prefix, or falls through to the default 404.

use axum::{routing::get, Router};
use sqlx::PgPool;

use super::routes;

/// Path of the registry's own health route, relative to its mount point
pub const HEALTH_PATH: &str = "/health";

/// A dispatcher that can be mounted under a fixed prefix.
///
/// Auth and order routers plug in here once they exist.
pub trait SubRouter: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Mount point, e.g. `/orders`
    fn prefix(&self) -> &str;

    /// Routes relative to the mount point
    fn router(&self) -> Router<PgPool>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid mount prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: &'static str },

    #[error("Prefix '{prefix}' is already mounted by '{mounted_by}'")]
    DuplicatePrefix { prefix: String, mounted_by: String },
}

/// Ordered collection of mounted sub-routers
#[derive(Default)]
pub struct RouterRegistry {
    mounts: Vec<Box<dyn SubRouter>>,
}

impl RouterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sub-router at its prefix
    pub fn mount<R>(&mut self, sub: R) -> Result<(), RegistryError>
    where
        R: SubRouter + 'static,
    {
        let prefix = sub.prefix();
        validate_prefix(prefix)?;

        if let Some(existing) = self.mounts.iter().find(|m| m.prefix() == prefix) {
            return Err(RegistryError::DuplicatePrefix {
                prefix: prefix.to_string(),
                mounted_by: existing.name().to_string(),
            });
        }

        tracing::debug!(router = sub.name(), prefix, "Mounted sub-router");
        self.mounts.push(Box::new(sub));
        Ok(())
    }

    /// Mounted prefixes in mount order
    pub fn prefixes(&self) -> Vec<&str> {
        self.mounts.iter().map(|m| m.prefix()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Build the dispatcher: the health route plus every mount
    pub fn into_router(self) -> Router<PgPool> {
        self.mounts.iter().fold(
            Router::new().route(HEALTH_PATH, get(routes::registry_health)),
            |router, sub| router.nest(sub.prefix(), sub.router()),
        )
    }
}

fn validate_prefix(prefix: &str) -> Result<(), RegistryError> {
    let reject = |reason| {
        Err(RegistryError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason,
        })
    };

    if !prefix.starts_with('/') {
        return reject("must start with '/'");
    }
    if prefix == "/" {
        return reject("cannot mount at the root");
    }
    if prefix.ends_with('/') {
        return reject("must not end with '/'");
    }
    if prefix.contains("//") {
        return reject("contains an empty segment");
    }
    if prefix.contains(':') || prefix.contains('*') {
        return reject("must be a fixed path");
    }
    if prefix == HEALTH_PATH {
        return reject("collides with the registry health route");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::util::ServiceExt;

    struct Named {
        name: &'static str,
        prefix: &'static str,
    }

    impl SubRouter for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn prefix(&self) -> &str {
            self.prefix
        }

        fn router(&self) -> Router<PgPool> {
            let name = self.name;
            Router::new().route("/ping", get(move || async move { name }))
        }
    }

    fn named(name: &'static str, prefix: &'static str) -> Named {
        Named { name, prefix }
    }

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://storefront@127.0.0.1:1/storefront")
            .unwrap()
    }

    async fn get_text(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_rejects_malformed_prefixes() {
        for prefix in ["auth", "/", "/auth/", "//auth", "/orders/:id", "/files/*rest"] {
            let mut registry = RouterRegistry::new();
            let err = registry.mount(named("bad", prefix)).unwrap_err();
            assert!(
                matches!(err, RegistryError::InvalidPrefix { .. }),
                "prefix {prefix} should be rejected"
            );
        }
        assert!(RouterRegistry::new().mount(named("bad", "/health")).is_err());
    }

    #[test]
    fn test_rejects_duplicate_prefix() {
        let mut registry = RouterRegistry::new();
        registry.mount(named("orders", "/orders")).unwrap();

        let err = registry.mount(named("orders-v2", "/orders")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicatePrefix {
                prefix: "/orders".to_string(),
                mounted_by: "orders".to_string(),
            }
        );
        assert_eq!(registry.prefixes(), vec!["/orders"]);
    }

    #[test]
    fn test_prefixes_keep_mount_order() {
        let mut registry = RouterRegistry::new();
        assert!(registry.is_empty());

        registry.mount(named("auth", "/auth")).unwrap();
        registry.mount(named("orders", "/orders")).unwrap();

        assert_eq!(registry.prefixes(), vec!["/auth", "/orders"]);
    }

    #[tokio::test]
    async fn test_health_and_mounts_dispatch() {
        let mut registry = RouterRegistry::new();
        registry.mount(named("auth", "/auth")).unwrap();
        registry.mount(named("orders", "/orders")).unwrap();
        let router = registry.into_router().with_state(lazy_pool());

        let (status, body) = get_text(router.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"API routes active"}"#);

        let (status, body) = get_text(router.clone(), "/orders/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "orders");

        let (status, body) = get_text(router.clone(), "/auth/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "auth");

        let (status, _) = get_text(router, "/inventory/ping").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
