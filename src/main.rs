//! storefront_api - backend for the storefront mobile client
//!
//! Loads configuration, connects to the database and serves the HTTP API.
//! Any startup failure is logged and ends the process with a non-zero status.

use storefront_api::{server, Config, StartupError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn start(config: Result<Config, storefront_api::ConfigError>) -> Result<(), StartupError> {
    let config = config?;
    tracing::info!(environment = %config.environment, "Starting storefront_api server");
    server::run(config).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.as_ref().map(Config::is_production).unwrap_or(false));

    if let Err(e) = start(config).await {
        tracing::error!(error = %e, "Failed to start server");
        return Err(anyhow::Error::new(e).context("storefront_api failed to start"));
    }

    Ok(())
}
