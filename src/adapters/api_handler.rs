//! REST API handlers for chat, file listing, upload and deletion
//!
//! Each handler builds its own agent and MCP connection, runs one turn (or
//! one direct tool call for uploads) and releases the connection before
//! returning, whatever the outcome.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapters::agent_factory::AgentFactory;
use crate::adapters::upload::{self, UploadError, UploadResponse};
use crate::agents::memory::ConversationStore;
use crate::agents::{AgentError, AgentRuntime, RunOutput, Session};
use crate::domain::{FilesListResponse, ToolClientError};

/// Instruction sent to the files agent
pub const FILES_INSTRUCTION: &str = "Please use the get_files tool to retrieve all documents";

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub factory: Arc<AgentFactory>,
    pub runtime: Arc<dyn AgentRuntime>,
    pub sessions: Arc<dyn ConversationStore>,
}

/// Errors returned to API clients as `{"detail": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    GatewayTimeout(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ToolClientError> for ApiError {
    fn from(err: ToolClientError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        match err {
            UploadError::MissingFilename => ApiError::BadRequest(message),
            UploadError::TooLarge { .. } | UploadError::TooLargeForRemote { .. } => {
                ApiError::PayloadTooLarge(message)
            }
            UploadError::Timeout => ApiError::GatewayTimeout(message),
            _ => ApiError::Internal(message),
        }
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Deprecated: history now comes from the session store
    #[serde(default)]
    pub conversation_history: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub status: String,
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub document_ids: Option<Vec<String>>,
}

impl DeleteRequest {
    /// A non-empty `document_id` wins over `document_ids`
    pub fn into_document_ids(self) -> Result<Vec<String>, ApiError> {
        if let Some(id) = self.document_id.filter(|id| !id.is_empty()) {
            info!("Received request to delete single file: {}", id);
            return Ok(vec![id]);
        }

        match self.document_ids.filter(|ids| !ids.is_empty()) {
            Some(ids) => {
                info!("Received request to bulk delete {} files", ids.len());
                Ok(ids)
            }
            None => Err(ApiError::BadRequest(
                "Either document_id or document_ids must be provided".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
    pub details: String,
}

// ============================================================================
// Helpers
// ============================================================================

/// Natural-language instruction asking the agent to delete `ids`
pub fn delete_instruction(ids: &[String]) -> String {
    match ids {
        [id] => format!(
            "Please use the delete_document tool to delete the document with id: {}",
            id
        ),
        _ => {
            let quoted: Vec<String> = ids.iter().map(|id| format!("\"{}\"", id)).collect();
            format!(
                "Please use the delete_documents tool to delete multiple documents with ids: [{}]",
                quoted.join(", ")
            )
        }
    }
}

/// Whether the agent's reply reports a successful deletion
pub fn deletion_confirmed(output: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("successfully") || lower.contains("deleted")
}

/// Turn the files agent output into a listing body.
///
/// Structured output matching [`FilesListResponse`] is returned as-is.
/// Otherwise the text between the first `{` and the last `}` is parsed;
/// a listing is normalized, any other JSON is passed through, and anything
/// unparsable yields an empty listing with an error.
pub fn parse_files_listing(output: RunOutput) -> Value {
    if let RunOutput::Structured(value) = &output {
        if let Ok(listing) = serde_json::from_value::<FilesListResponse>(value.clone()) {
            return json!(listing);
        }
    }

    let text = output.to_text();
    let candidate = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            warn!("Files agent returned no JSON object");
            return json!({"files": [], "error": "Could not parse files list"});
        }
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => match serde_json::from_value::<FilesListResponse>(value.clone()) {
            Ok(listing) => json!(listing),
            Err(_) => value,
        },
        Err(e) => {
            warn!("Could not parse files list: {}", e);
            json!({"files": [], "error": "Could not parse files list"})
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/chat
pub async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(
        "Received chat request: {}, session_id: {:?}",
        request.message, request.session_id
    );
    if request.conversation_history.is_some() {
        debug!("Ignoring deprecated conversation_history field");
    }

    let (agent, lease) = state.factory.create_agent().await.map_err(|e| {
        error!("Error in chat: {}", e);
        ApiError::from(e)
    })?;

    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!("Using session: {}", session_id);
    let session = Session::new(session_id.clone(), Arc::clone(&state.sessions));

    let result = state
        .runtime
        .run(&agent, &request.message, Some(&session))
        .await;
    lease.release("chat").await;

    let output = result.map_err(|e| {
        error!("Error in chat: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(ChatResponse {
        response: output.to_text(),
        status: "success".to_string(),
        session_id,
    }))
}

/// GET /api/files
pub async fn list_files(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    info!("Received request to get files");

    let (agent, lease) = state.factory.create_files_agent().await.map_err(|e| {
        error!("Error getting files: {}", e);
        ApiError::from(e)
    })?;

    let result = state.runtime.run(&agent, FILES_INSTRUCTION, None).await;
    lease.release("files").await;

    let output = result.map_err(|e| {
        error!("Error getting files: {}", e);
        ApiError::from(e)
    })?;
    debug!("Files agent result: {:?}", output);

    Ok(Json(parse_files_listing(output)))
}

/// POST /api/upload
pub async fn upload_file(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(ApiError::from)?;
        upload = Some((filename, data));
        break;
    }

    let Some((filename, data)) = upload else {
        return Err(UploadError::MissingFilename.into());
    };
    info!("Received file upload: {}", filename);

    upload::upload_file(&state.factory, &filename, &data)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Error uploading file: {}", e);
            ApiError::from(e)
        })
}

/// DELETE /api/files
pub async fn delete_files(
    State(state): State<ApiState>,
    request: Option<Json<DeleteRequest>>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let ids = request.into_document_ids()?;
    delete_documents(&state, ids).await
}

/// DELETE /api/files/:document_id
pub async fn delete_file_legacy(
    State(state): State<ApiState>,
    Path(document_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let request = DeleteRequest {
        document_id: Some(document_id),
        document_ids: None,
    };
    let ids = request.into_document_ids()?;
    delete_documents(&state, ids).await
}

async fn delete_documents(
    state: &ApiState,
    ids: Vec<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let (agent, lease) = state.factory.create_agent().await.map_err(|e| {
        error!("Error deleting file(s): {}", e);
        ApiError::from(e)
    })?;

    let instruction = delete_instruction(&ids);
    let result = state.runtime.run(&agent, &instruction, None).await;
    lease.release("delete").await;

    let output = result
        .map_err(|e| {
            error!("Error deleting file(s): {}", e);
            ApiError::from(e)
        })?
        .to_text();

    if deletion_confirmed(&output) {
        Ok(Json(DeleteResponse {
            status: "success".to_string(),
            message: format!("Successfully deleted {} document(s)", ids.len()),
            details: output,
        }))
    } else {
        warn!("Deletion not confirmed by agent: {}", output);
        Err(ApiError::BadRequest(output))
    }
}
