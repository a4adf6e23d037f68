//! API Routes
//!
//! Health endpoints. Neither inspects the request nor touches the database.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Path of the root health route, answered before any router is consulted
pub const ROOT_HEALTH_PATH: &str = "/api/health";

// =========================================================================
// Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendHealth {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryHealth {
    pub status: String,
}

// =========================================================================
// Handlers
// =========================================================================

/// Root health check, independent of the router registry
pub async fn backend_health() -> (StatusCode, Json<BackendHealth>) {
    (
        StatusCode::OK,
        Json(BackendHealth {
            message: "Backend is running!".to_string(),
        }),
    )
}

/// The registry's own health check
pub async fn registry_health() -> Json<RegistryHealth> {
    Json(RegistryHealth {
        status: "API routes active".to_string(),
    })
}
