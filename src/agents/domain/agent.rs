//! Agent definition, session handle and run output

use schemars::{gen::SchemaSettings, JsonSchema};
use serde_json::Value;
use std::sync::Arc;

use super::Message;
use crate::agents::error::AgentResult;
use crate::agents::memory::ConversationStore;
use crate::domain::ToolClient;

/// A configured conversational agent.
///
/// Agents are built fresh for every request and dropped afterwards; the tool
/// clients they hold are owned (and closed) by whoever connected them.
#[derive(Clone)]
pub struct Agent {
    /// Display name of the agent
    pub name: String,
    /// System instructions
    pub instructions: String,
    /// Model identifier passed to the LLM provider
    pub model: String,
    /// Remote tool servers the agent may call
    pub tool_clients: Vec<Arc<dyn ToolClient>>,
    /// Schema the final output must conform to, if any
    pub output_schema: Option<OutputSchema>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: model.into(),
            tool_clients: Vec::new(),
            output_schema: None,
        }
    }

    pub fn with_tool_client(mut self, client: Arc<dyn ToolClient>) -> Self {
        self.tool_clients.push(client);
        self
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tool_clients", &self.tool_clients.len())
            .field("output_schema", &self.output_schema.as_ref().map(|s| &s.name))
            .finish()
    }
}

/// Named JSON Schema for structured agent output
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    /// Derive the schema of `T` with all subschemas inlined
    pub fn for_type<T: JsonSchema>(name: impl Into<String>) -> Self {
        let generator = SchemaSettings::draft07()
            .with(|settings| {
                settings.inline_subschemas = true;
                settings.meta_schema = None;
            })
            .into_generator();
        let root = generator.into_root_schema_for::<T>();

        Self {
            name: name.into(),
            schema: serde_json::to_value(root).unwrap_or(Value::Null),
        }
    }
}

/// Final output of one agent turn
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    /// Free text from the model
    Text(String),
    /// Output that parsed as JSON under the agent's output schema
    Structured(Value),
}

impl RunOutput {
    pub fn to_text(&self) -> String {
        match self {
            RunOutput::Text(text) => text.clone(),
            RunOutput::Structured(value) => value.to_string(),
        }
    }
}

/// Persistent conversation attached to an agent run
#[derive(Clone)]
pub struct Session {
    id: String,
    store: Arc<dyn ConversationStore>,
}

impl Session {
    pub fn new(id: impl Into<String>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            id: id.into(),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Prior turns, oldest first
    pub async fn history(&self) -> AgentResult<Vec<Message>> {
        self.store.load(&self.id).await
    }

    pub async fn append(&self, messages: &[Message]) -> AgentResult<()> {
        self.store.append(&self.id, messages).await
    }
}
