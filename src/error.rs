//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{BodyError, RegistryError};
use crate::config::ConfigError;

/// Body of every 500 response. Internal detail never reaches the client.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong!";

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Request-handling error types.
///
/// Every variant is answered with the uniform 500; the detail only reaches
/// the log.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Request body error: {0}")]
    Body(#[from] BodyError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The uniform 500 response
    pub fn internal() -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new(GENERIC_FAILURE_MESSAGE)),
        )
            .into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Unhandled error while processing request");
        ErrorResponse::internal()
    }
}

/// Fatal errors raised before the server starts accepting connections
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Router registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Database connection failed: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> ErrorResponse {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let response = AppError::Internal("connection reset by peer".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body.message, "Something went wrong!");
    }

    #[tokio::test]
    async fn test_body_errors_are_500() {
        let response = AppError::from(BodyError::NotObjectOrArray).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await.message, GENERIC_FAILURE_MESSAGE);

        let response = AppError::from(BodyError::TooLarge {
            kind: "JSON",
            limit: 10,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
