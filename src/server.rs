//! Server bootstrap
//!
//! Assembles the middleware pipeline around the router registry and drives
//! the startup sequence: database first, then the listening socket.

use axum::{extract::DefaultBodyLimit, middleware, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, extract::BodyLimits, routes::ROOT_HEALTH_PATH, RouterRegistry};
use crate::config::Config;
use crate::db;
use crate::error::StartupError;

/// Build the application router
pub fn build_app(config: &Config, pool: PgPool, registry: RouterRegistry) -> Router {
    if format!("{}{}", api::API_PREFIX, api::registry::HEALTH_PATH) == ROOT_HEALTH_PATH {
        tracing::warn!(
            path = ROOT_HEALTH_PATH,
            "Root health route shadows the router registry's /health at this path"
        );
    }
    if registry.is_empty() {
        tracing::info!("No sub-routers mounted under {}", api::API_PREFIX);
    }
    for prefix in registry.prefixes() {
        tracing::info!("Mounting {}{}", api::API_PREFIX, prefix);
    }

    // Layers are added innermost first; the last one added sees the request first
    Router::new()
        .nest(api::API_PREFIX, registry.into_router())
        .layer(middleware::from_fn(api::middleware::root_health))
        .layer(middleware::from_fn_with_state(
            BodyLimits::from_config(config),
            api::extract::parse_body,
        ))
        .layer(DefaultBodyLimit::max(config.json_body_limit))
        .layer(CatchPanicLayer::custom(api::middleware::handle_panic))
        .layer(api::middleware::cors_layer())
        .layer(middleware::from_fn(api::middleware::security_headers))
        .layer(middleware::from_fn(api::middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(pool)
}

/// Connect to the database, then bind and serve.
///
/// A database failure returns before any socket is opened. No retry.
pub async fn run(config: Config) -> Result<(), StartupError> {
    tracing::info!("Connecting to database...");
    let pool = db::connect(&config.database)
        .await
        .map_err(StartupError::Database)?;
    tracing::info!("Database connected successfully");

    let registry = api::create_registry()?;
    let app = build_app(&config, pool, registry);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!("Server running on port {}", config.port);

    axum::serve(listener, app)
        .await
        .map_err(StartupError::Serve)
}
