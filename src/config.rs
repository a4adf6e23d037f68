//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default listening port when `PORT` is unset
pub const DEFAULT_PORT: u16 = 5000;

/// Default JSON body cap (10 MB)
pub const DEFAULT_JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Default URL-encoded body cap (100 kB)
pub const DEFAULT_FORM_BODY_LIMIT: usize = 100 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: IpAddr,

    /// Server port
    pub port: u16,

    /// Database connection settings
    pub database: DatabaseConfig,

    /// Maximum JSON body size in bytes
    pub json_body_limit: usize,

    /// Maximum URL-encoded body size in bytes
    pub form_body_limit: usize,

    /// Environment (development, production)
    pub environment: String,
}

/// Settings consumed by the database collaborator
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum database connections in pool
    pub max_connections: u32,

    /// How long the startup connect may wait for a connection
    pub connect_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a closure instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;
        let connect_timeout_secs: u64 = parse_or(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", 5)?;

        let host = parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let json_body_limit = parse_or(&lookup, "JSON_BODY_LIMIT_BYTES", DEFAULT_JSON_BODY_LIMIT)?;
        let form_body_limit = parse_or(&lookup, "FORM_BODY_LIMIT_BYTES", DEFAULT_FORM_BODY_LIMIT)?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        Ok(Self {
            host,
            port,
            database: DatabaseConfig {
                url,
                max_connections,
                connect_timeout: Duration::from_secs(connect_timeout_secs),
            },
            json_body_limit,
            form_body_limit,
            environment,
        })
    }

    /// Address the server binds to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
