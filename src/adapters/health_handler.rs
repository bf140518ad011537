use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    pub server: String,
}

/// Liveness check, independent of the MCP server and the model
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthStatus {
            status: "ok".to_string(),
            server: "running".to_string(),
        }),
    )
}
