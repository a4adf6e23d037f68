//! storefront_api Library
//!
//! HTTP bootstrap for the storefront backend: middleware pipeline, router
//! registry and the startup sequence. Re-exports modules for integration
//! testing and the binary.

pub mod api;
pub mod config;
pub mod db;
mod error;
pub mod server;

pub use config::{Config, ConfigError, DatabaseConfig};
pub use error::{AppError, AppResult, ErrorResponse, StartupError, GENERIC_FAILURE_MESSAGE};
