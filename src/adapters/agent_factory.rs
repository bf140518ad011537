//! Per-request agent construction
//!
//! Every request gets its own MCP connection wrapped in a
//! [`ToolClientLease`]. The lease is released explicitly at the end of the
//! handler; if the handler future is dropped first, the lease closes the
//! connection from a spawned task instead.

use std::sync::Arc;
use tracing::{info, warn};

use crate::agents::{Agent, OutputSchema};
use crate::domain::{FilesListResponse, ToolClient, ToolClientError, ToolConnector};

pub const KB_AGENT_NAME: &str = "Knowledge Base Assistant";
pub const FILES_AGENT_NAME: &str = "Files List Agent";
pub const FILES_AGENT_INSTRUCTIONS: &str = "You are an agent that retrieves file listings. Use the get_files tool and return the results in the specified format.";

/// Owns a connected tool client for the duration of one request
pub struct ToolClientLease {
    client: Arc<dyn ToolClient>,
    released: bool,
}

impl ToolClientLease {
    pub fn new(client: Arc<dyn ToolClient>) -> Self {
        Self {
            client,
            released: false,
        }
    }

    pub fn client(&self) -> &dyn ToolClient {
        self.client.as_ref()
    }

    /// Close the connection. Failures are logged and never returned.
    pub async fn release(mut self, request: &str) {
        self.released = true;
        match self.client.close().await {
            Ok(()) => info!("MCP server cleanup completed for {} request", request),
            Err(e) => warn!("MCP server cleanup failed: {}", e),
        }
    }
}

impl Drop for ToolClientLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let client = Arc::clone(&self.client);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match client.close().await {
                        Ok(()) => info!("MCP server cleanup completed for abandoned request"),
                        Err(e) => warn!("MCP server cleanup failed: {}", e),
                    }
                });
            }
            Err(_) => warn!("MCP connection dropped outside of a runtime, cleanup skipped"),
        }
    }
}

/// Builds agents bound to a fresh MCP connection
pub struct AgentFactory {
    connector: Arc<dyn ToolConnector>,
    system_prompt: String,
    model: String,
}

impl AgentFactory {
    pub fn new(
        connector: Arc<dyn ToolConnector>,
        system_prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            system_prompt: system_prompt.into(),
            model: model.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.connector.endpoint()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Open a connection without building an agent
    pub async fn connect(&self) -> Result<ToolClientLease, ToolClientError> {
        let client = self.connector.connect().await?;
        Ok(ToolClientLease::new(client))
    }

    /// General knowledge-base agent answering in free text
    pub async fn create_agent(&self) -> Result<(Agent, ToolClientLease), ToolClientError> {
        let client = self.connector.connect().await?;
        info!("Connected to MCP server for agent");

        let agent = Agent::new(KB_AGENT_NAME, &self.system_prompt, &self.model)
            .with_tool_client(Arc::clone(&client));
        Ok((agent, ToolClientLease::new(client)))
    }

    /// Agent constrained to answer with a [`FilesListResponse`]
    pub async fn create_files_agent(&self) -> Result<(Agent, ToolClientLease), ToolClientError> {
        let client = self.connector.connect().await?;
        info!("Connected to MCP server for files agent");

        let agent = Agent::new(FILES_AGENT_NAME, FILES_AGENT_INSTRUCTIONS, &self.model)
            .with_tool_client(Arc::clone(&client))
            .with_output_schema(OutputSchema::for_type::<FilesListResponse>(
                "FilesListResponse",
            ));
        Ok((agent, ToolClientLease::new(client)))
    }
}
