//! MCP Client Adapter
//!
//! Connects to the knowledge-base MCP server over streamable HTTP using the
//! rmcp client. Every connection is opened for one request and closed when
//! that request finishes; nothing here is pooled.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use rmcp::model::{
    CallToolRequestParam, ClientCapabilities, ClientInfo, Implementation, RawContent,
};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{CredentialSettings, McpSettings};
use crate::domain::{
    ConnectionState, Tool, ToolClient, ToolClientError, ToolConnector, ToolContent, ToolOutput,
};

const SUPABASE_URL_HEADER: &str = "x-supabase-url";
const SUPABASE_KEY_HEADER: &str = "x-supabase-key";
const OPENAI_KEY_HEADER: &str = "x-openai-key";

/// Whether the endpoint host is the local machine
pub fn is_loopback_endpoint(endpoint: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(endpoint) else {
        return false;
    };

    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

/// Build the header set sent with every MCP request.
///
/// Credentials that are not configured are left out rather than sent empty.
fn credential_headers(credentials: &CredentialSettings) -> Result<HeaderMap, ToolClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/event-stream"),
    );

    let pairs = [
        (SUPABASE_URL_HEADER, &credentials.supabase_url),
        (SUPABASE_KEY_HEADER, &credentials.supabase_service_key),
        (OPENAI_KEY_HEADER, &credentials.openai_api_key),
    ];

    for (name, value) in pairs {
        let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };
        let mut value = HeaderValue::from_str(value).map_err(|e| {
            ToolClientError::Configuration(format!("Invalid value for header {}: {}", name, e))
        })?;
        value.set_sensitive(name != SUPABASE_URL_HEADER);
        headers.insert(HeaderName::from_static(name), value);
    }

    Ok(headers)
}

fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            title: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// Opens fresh [`McpToolClient`] handles against one endpoint
pub struct McpConnector {
    endpoint: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl McpConnector {
    pub fn new(mcp: &McpSettings, credentials: &CredentialSettings) -> Result<Self, ToolClientError> {
        let timeout = Duration::from_secs(mcp.timeout_seconds);
        let http = reqwest::Client::builder()
            .default_headers(credential_headers(credentials)?)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ToolClientError::Configuration(e.to_string()))?;

        Ok(Self {
            endpoint: mcp.server_url.clone(),
            timeout,
            http,
        })
    }
}

#[async_trait]
impl ToolConnector for McpConnector {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Arc<dyn ToolClient>, ToolClientError> {
        let client = McpToolClient::new(self.endpoint.clone(), self.timeout);
        client.connect(self.http.clone()).await?;
        Ok(Arc::new(client))
    }
}

struct Connection {
    state: ConnectionState,
    service: Option<RunningService<RoleClient, ClientInfo>>,
}

/// One MCP session over streamable HTTP
pub struct McpToolClient {
    endpoint: String,
    timeout: Duration,
    connection: Mutex<Connection>,
}

impl McpToolClient {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            connection: Mutex::new(Connection {
                state: ConnectionState::Disconnected,
                service: None,
            }),
        }
    }

    /// Perform the MCP handshake
    pub async fn connect(&self, http: reqwest::Client) -> Result<(), ToolClientError> {
        let mut connection = self.connection.lock().await;
        if connection.state != ConnectionState::Disconnected {
            return Err(ToolClientError::NotConnected(connection.state));
        }
        connection.state = ConnectionState::Connecting;

        let transport = StreamableHttpClientTransport::with_client(
            http,
            StreamableHttpClientTransportConfig::with_uri(self.endpoint.clone()),
        );

        let result = tokio::time::timeout(self.timeout, client_info().serve(transport)).await;
        let service = match result {
            Ok(Ok(service)) => service,
            Ok(Err(e)) => {
                connection.state = ConnectionState::Disconnected;
                return Err(ToolClientError::Connect {
                    endpoint: self.endpoint.clone(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                connection.state = ConnectionState::Disconnected;
                return Err(self.timeout_error("connect"));
            }
        };

        if let Some(info) = service.peer_info() {
            debug!(
                "MCP server {} {} at {}",
                info.server_info.name, info.server_info.version, self.endpoint
            );
        }

        connection.service = Some(service);
        connection.state = ConnectionState::Connected;
        Ok(())
    }

    fn timeout_error(&self, operation: &str) -> ToolClientError {
        ToolClientError::Timeout {
            operation: operation.to_string(),
            seconds: self.timeout.as_secs(),
        }
    }

    async fn peer(&self) -> Result<Peer<RoleClient>, ToolClientError> {
        let connection = self.connection.lock().await;
        match (&connection.service, connection.state) {
            (Some(service), ConnectionState::Connected) => Ok(service.peer().clone()),
            (_, state) => Err(ToolClientError::NotConnected(state)),
        }
    }
}

fn convert_content(content: rmcp::model::Content) -> ToolContent {
    match &content.raw {
        RawContent::Text(text) => ToolContent::Text(text.text.clone()),
        _ => ToolContent::Other(serde_json::to_value(&content).unwrap_or(Value::Null)),
    }
}

#[async_trait]
impl ToolClient for McpToolClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn state(&self) -> ConnectionState {
        self.connection.lock().await.state
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, ToolClientError> {
        let peer = self.peer().await?;
        let tools = tokio::time::timeout(self.timeout, peer.list_all_tools())
            .await
            .map_err(|_| self.timeout_error("list_tools"))?
            .map_err(|e| ToolClientError::Transport(e.to_string()))?;

        Ok(tools
            .into_iter()
            .map(|tool| Tool {
                name: tool.name.to_string(),
                description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
                input_schema: Value::Object((*tool.input_schema).clone()),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolClientError> {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(ToolClientError::InvalidArguments(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        let peer = self.peer().await?;
        debug!("Calling MCP tool {}", name);

        let result = tokio::time::timeout(
            self.timeout,
            peer.call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            }),
        )
        .await
        .map_err(|_| self.timeout_error("call_tool"))?
        .map_err(|e| ToolClientError::Transport(e.to_string()))?;

        Ok(ToolOutput::CallResult {
            content: result.content.into_iter().map(convert_content).collect(),
            is_error: result.is_error.unwrap_or(false),
        })
    }

    async fn close(&self) -> Result<(), ToolClientError> {
        let mut connection = self.connection.lock().await;
        connection.state = ConnectionState::Closed;

        let Some(service) = connection.service.take() else {
            return Ok(());
        };

        service
            .cancel()
            .await
            .map_err(|e| ToolClientError::Transport(e.to_string()))?;
        info!("Closed MCP session with {}", self.endpoint);
        Ok(())
    }
}
