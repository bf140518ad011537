use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Tool advertised by the remote knowledge-base server
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One entry of the knowledge-base file listing
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct FileInfo {
    pub id: String,
    pub filename: String,
    pub created_at: String,
}

/// Listing envelope returned by `GET /api/files`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct FilesListResponse {
    pub files: Vec<FileInfo>,
}

/// Lifecycle of a remote tool client handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// A single content item of a protocol call result
#[derive(Debug, Clone, PartialEq)]
pub enum ToolContent {
    Text(String),
    /// Non-text content (images, embedded resources) kept in wire form
    Other(Value),
}

impl ToolContent {
    /// Text of the item, or its JSON encoding for non-text content
    pub fn to_text(&self) -> String {
        match self {
            ToolContent::Text(text) => text.clone(),
            ToolContent::Other(value) => value.to_string(),
        }
    }
}

/// Raw result of a tool invocation.
///
/// Tool servers are not consistent about what they hand back, so the
/// result is kept in the shape it arrived in and decoded by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Protocol-level call result with ordered content items
    CallResult {
        content: Vec<ToolContent>,
        is_error: bool,
    },
    /// A plain JSON object
    Mapping(Map<String, Value>),
    /// A JSON array of content items
    Sequence(Vec<Value>),
    /// Any other JSON value
    Other(Value),
}

impl ToolOutput {
    /// Classify an arbitrary JSON value into one of the raw shapes
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => ToolOutput::Mapping(map),
            Value::Array(items) => ToolOutput::Sequence(items),
            other => ToolOutput::Other(other),
        }
    }

    /// Build a call result holding a single text item
    pub fn text(text: impl Into<String>) -> Self {
        ToolOutput::CallResult {
            content: vec![ToolContent::Text(text.into())],
            is_error: false,
        }
    }

    /// Flatten the output to text, as fed back to a model
    pub fn to_text(&self) -> String {
        match self {
            ToolOutput::CallResult { content, .. } => content
                .iter()
                .map(ToolContent::to_text)
                .collect::<Vec<_>>()
                .join("\n"),
            ToolOutput::Mapping(map) => Value::Object(map.clone()).to_string(),
            ToolOutput::Sequence(items) => Value::Array(items.clone()).to_string(),
            ToolOutput::Other(Value::String(text)) => text.clone(),
            ToolOutput::Other(value) => value.to_string(),
        }
    }
}

/// Errors raised by remote tool clients
#[derive(Debug, Error)]
pub enum ToolClientError {
    #[error("Failed to connect to MCP server at {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    #[error("MCP transport error: {0}")]
    Transport(String),

    #[error("MCP {operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("MCP client is not connected (state: {0})")]
    NotConnected(ConnectionState),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

impl ToolClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolClientError::Timeout { .. })
    }
}

/// Port for a connected remote tool client handle.
///
/// A handle is connected once, used for the duration of one request and
/// closed afterwards. It is never shared between requests.
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Endpoint URL this handle talks to
    fn endpoint(&self) -> &str;

    async fn state(&self) -> ConnectionState;

    async fn list_tools(&self) -> Result<Vec<Tool>, ToolClientError>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolClientError>;

    /// Close the connection. Closing an already closed handle is a no-op.
    async fn close(&self) -> Result<(), ToolClientError>;
}

/// Port that opens fresh tool client handles
#[async_trait]
pub trait ToolConnector: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn connect(&self) -> Result<Arc<dyn ToolClient>, ToolClientError>;
}
