//! # kb-bridge
//!
//! Middle-layer HTTP service between chat clients and a knowledge-base MCP
//! server. Each request gets a freshly built agent bound to its own MCP
//! connection; results are normalized into stable JSON envelopes and the
//! connection is closed before the response is sent.
//!
//! ## Endpoints
//!
//! - `GET /health`
//! - `POST /api/chat`
//! - `GET /api/files`
//! - `POST /api/upload`
//! - `DELETE /api/files` and `DELETE /api/files/:document_id`
//!
//! ## Architecture
//!
//! - **Domain**: tool client ports and knowledge-base types
//! - **Agents**: agent definition, ReAct runtime, LLM provider, session store
//! - **Adapters**: HTTP handlers, MCP client, agent factory, upload pipeline
//! - **Config**: settings from file, environment and CLI

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod domain;

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::health_handler;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `state` - Agent factory, runtime and session store shared by handlers
/// * `max_body_bytes` - Request body ceiling; uploads apply their own size policy below it
pub fn create_app(state: ApiState, max_body_bytes: usize) -> Router {
    let api_router = Router::new()
        .route("/chat", post(api_handler::chat))
        .route(
            "/files",
            get(api_handler::list_files).delete(api_handler::delete_files),
        )
        .route("/files/:document_id", delete(api_handler::delete_file_legacy))
        .route("/upload", post(api_handler::upload_file))
        .with_state(state);

    Router::new()
        .route("/health", get(health_handler::health))
        .nest("/api", api_router)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}
