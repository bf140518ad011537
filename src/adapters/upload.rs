//! File upload to the knowledge base
//!
//! Uploads bypass the agent: the handler talks to the MCP server directly
//! with `upload_image` or `upload_document`. Tool servers return results in
//! several shapes, so the raw [`ToolOutput`] is first decoded into an
//! [`UploadOutcome`] and only then mapped to a response.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapters::agent_factory::AgentFactory;
use crate::adapters::mcp_client::is_loopback_endpoint;
use crate::domain::{ToolClient, ToolClientError, ToolContent, ToolOutput};

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_REMOTE_DOCUMENT_BYTES: usize = 2 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Document,
}

impl UploadKind {
    /// Classify by case-insensitive file extension
    pub fn from_filename(filename: &str) -> Self {
        let is_image = extension(filename)
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        if is_image {
            UploadKind::Image
        } else {
            UploadKind::Document
        }
    }
}

fn extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|ext| ext.to_str())
}

fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No filename provided")]
    MissingFilename,

    #[error("File too large: {size_mb:.2} MB. Maximum size is 10 MB.")]
    TooLarge { size_mb: f64 },

    #[error("Files larger than 2MB are not supported by the remote MCP server due to request size limits. Your file is {size_mb:.2} MB. Please use a local MCP server for larger files.")]
    TooLargeForRemote { size_mb: f64 },

    #[error("Upload timed out. Please try a smaller file.")]
    Timeout,

    #[error("Empty response from upload tool")]
    EmptyResponse,

    #[error("Invalid response from upload tool")]
    InvalidResponse,

    /// The tool reported a failure
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    ToolClient(#[from] ToolClientError),

    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Response body of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub filename: String,
    pub document_id: Option<String>,
    pub message: String,
    pub details: Value,
}

/// Decoded upload tool result
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// A JSON object expected to carry `success` and friends
    Decoded(Map<String, Value>),
    /// Something that is not a JSON object, taken as success as-is
    Unparsed(String),
}

impl UploadOutcome {
    /// Decode a raw tool output, dispatching on its shape
    pub fn decode(output: ToolOutput) -> Result<Self, UploadError> {
        match output {
            ToolOutput::CallResult { content, is_error } => Self::decode_call_result(content, is_error),
            ToolOutput::Mapping(map) => Ok(UploadOutcome::Decoded(map)),
            ToolOutput::Sequence(items) => Ok(Self::decode_sequence(items)),
            ToolOutput::Other(Value::String(text)) => Ok(UploadOutcome::Unparsed(text)),
            ToolOutput::Other(value) => Ok(UploadOutcome::Unparsed(value.to_string())),
        }
    }

    fn decode_call_result(content: Vec<ToolContent>, is_error: bool) -> Result<Self, UploadError> {
        let Some(first) = content.into_iter().next() else {
            error!("Empty call result content");
            return Err(UploadError::EmptyResponse);
        };

        let text = first.to_text();
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(UploadOutcome::Decoded(map)),
            _ if is_error => Err(UploadError::Failed(text)),
            _ => {
                error!("Failed to parse JSON response: {}", text);
                Err(UploadError::InvalidResponse)
            }
        }
    }

    fn decode_sequence(items: Vec<Value>) -> Self {
        let Some(first) = items.into_iter().next() else {
            return UploadOutcome::Unparsed("[]".to_string());
        };

        match first {
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    return Self::decode_text(text.clone());
                }
                if map.contains_key("success") {
                    UploadOutcome::Decoded(map)
                } else {
                    UploadOutcome::Unparsed(Value::Object(map).to_string())
                }
            }
            Value::String(text) => Self::decode_text(text),
            other => UploadOutcome::Unparsed(other.to_string()),
        }
    }

    fn decode_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => UploadOutcome::Decoded(map),
            _ => {
                info!("Non-JSON response, assuming success: {}", text);
                UploadOutcome::Unparsed(text)
            }
        }
    }

    /// Map the outcome to a response for `filename`
    pub fn into_response(self, filename: &str) -> Result<UploadResponse, UploadError> {
        match self {
            UploadOutcome::Decoded(map) => {
                if map.get("success").and_then(Value::as_bool) == Some(true) {
                    let document_id = map
                        .get("document")
                        .and_then(|document| document.get("id"))
                        .and_then(|id| match id {
                            Value::String(id) => Some(id.clone()),
                            Value::Number(id) => Some(id.to_string()),
                            _ => None,
                        });

                    Ok(UploadResponse {
                        status: "success".to_string(),
                        filename: filename.to_string(),
                        document_id,
                        message: format!("Successfully uploaded {}", filename),
                        details: Value::Object(map),
                    })
                } else {
                    let message = failure_message(&map);
                    error!("Upload failed: {}", message);
                    Err(UploadError::Failed(message))
                }
            }
            UploadOutcome::Unparsed(raw) => Ok(UploadResponse {
                status: "success".to_string(),
                filename: filename.to_string(),
                document_id: None,
                message: format!("Uploaded {}", filename),
                details: Value::String(raw),
            }),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn failure_message(map: &Map<String, Value>) -> String {
    let error = map
        .get("error")
        .filter(|v| !v.is_null())
        .map(value_text)
        .unwrap_or_else(|| "Unknown error".to_string());

    match map.get("details").filter(|v| !v.is_null()).map(value_text) {
        Some(details) if !details.is_empty() => format!("{}: {}", error, details),
        _ => error,
    }
}

/// Upload one file through a fresh MCP connection.
///
/// Size and filename checks run before connecting. The connection is
/// released on every path once it has been opened.
pub async fn upload_file(
    factory: &AgentFactory,
    filename: &str,
    data: &[u8],
) -> Result<UploadResponse, UploadError> {
    if filename.is_empty() {
        return Err(UploadError::MissingFilename);
    }

    let kind = UploadKind::from_filename(filename);
    let local = is_loopback_endpoint(factory.endpoint());
    debug!("Upload {} is {} bytes ({:?})", filename, data.len(), kind);

    if kind == UploadKind::Document {
        if data.len() > MAX_DOCUMENT_BYTES {
            return Err(UploadError::TooLarge {
                size_mb: megabytes(data.len()),
            });
        }
        if !local && data.len() > MAX_REMOTE_DOCUMENT_BYTES {
            return Err(UploadError::TooLargeForRemote {
                size_mb: megabytes(data.len()),
            });
        }
    }

    let lease = factory.connect().await?;
    let client = lease.client();
    let result = match kind {
        UploadKind::Image => upload_image(client, filename, data).await,
        UploadKind::Document if local => upload_local_document(client, filename, data).await,
        UploadKind::Document => upload_remote_document(client, filename, data).await,
    };
    lease.release("upload").await;

    let outcome = UploadOutcome::decode(result?)?;
    outcome.into_response(filename)
}

async fn upload_image(
    client: &dyn ToolClient,
    filename: &str,
    data: &[u8],
) -> Result<ToolOutput, UploadError> {
    info!("Processing image upload: {}", filename);
    let arguments = json!({
        "file_base64": STANDARD.encode(data),
        "original_filename": filename,
    });

    info!("Calling upload_image tool directly through MCP server...");
    Ok(client.call_tool("upload_image", arguments).await?)
}

async fn upload_local_document(
    client: &dyn ToolClient,
    filename: &str,
    data: &[u8],
) -> Result<ToolOutput, UploadError> {
    info!("Processing document upload: {}", filename);
    let suffix = extension(filename)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let mut staged = tempfile::Builder::new().suffix(&suffix).tempfile()?;
    staged.write_all(data)?;
    staged.flush()?;
    let path = staged.into_temp_path();

    info!("Calling upload_document tool with file_path...");
    let arguments = json!({ "file_path": path.to_string_lossy() });
    let result = client.call_tool("upload_document", arguments).await;

    let staged_path = path.display().to_string();
    match path.close() {
        Ok(()) => debug!("Removed staged upload {}", staged_path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove staged upload {}: {}", staged_path, e),
    }

    Ok(result?)
}

async fn upload_remote_document(
    client: &dyn ToolClient,
    filename: &str,
    data: &[u8],
) -> Result<ToolOutput, UploadError> {
    info!("Processing document upload: {}", filename);
    let arguments = json!({
        "file_base64": STANDARD.encode(data),
        "original_filename": filename,
    });

    info!("Calling upload_document tool with base64 data...");
    match client.call_tool("upload_document", arguments).await {
        Ok(output) => Ok(output),
        Err(e) if e.is_timeout() => {
            error!("Timeout during document upload");
            Err(UploadError::Timeout)
        }
        Err(e) => Err(e.into()),
    }
}
