//! ReAct runtime (Reasoning + Acting)

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::agents::domain::{
    Agent, AgentRuntime, Message, RunOutput, Session, ToolCall, ToolDefinition,
};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::{CompletionRequest, LlmProvider};
use crate::domain::ToolClient;

/// Tool-calling loop over an LLM provider.
///
/// Each model turn either answers or requests tool calls; requested calls are
/// routed to the tool client that advertised the tool and their results fed
/// back until the model produces a final answer or `max_turns` is reached.
pub struct ReActRuntime {
    llm: Arc<dyn LlmProvider>,
    max_turns: u32,
}

impl ReActRuntime {
    pub fn new(llm: Arc<dyn LlmProvider>, max_turns: u32) -> Self {
        Self { llm, max_turns }
    }

    /// Discover tools on every client of the agent
    async fn collect_tools(
        agent: &Agent,
    ) -> AgentResult<(Vec<ToolDefinition>, HashMap<String, Arc<dyn ToolClient>>)> {
        let mut definitions = Vec::new();
        let mut routes = HashMap::new();

        for client in &agent.tool_clients {
            for tool in client.list_tools().await? {
                if routes.contains_key(&tool.name) {
                    tracing::warn!(
                        "Tool {} advertised by more than one server, keeping the first",
                        tool.name
                    );
                    continue;
                }
                routes.insert(tool.name.clone(), Arc::clone(client));
                definitions.push(ToolDefinition::from(tool));
            }
        }

        Ok((definitions, routes))
    }

    async fn execute_tool_call(
        routes: &HashMap<String, Arc<dyn ToolClient>>,
        call: &ToolCall,
    ) -> String {
        let Some(client) = routes.get(&call.name) else {
            return format!("Error: unknown tool {}", call.name);
        };

        tracing::debug!("Calling tool {} on {}", call.name, client.endpoint());
        match client.call_tool(&call.name, call.arguments.clone()).await {
            Ok(output) => output.to_text(),
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", call.name, e);
                format!("Error: {}", e)
            }
        }
    }

    fn final_output(agent: &Agent, content: String) -> RunOutput {
        if agent.output_schema.is_none() {
            return RunOutput::Text(content);
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(value) => RunOutput::Structured(value),
            Err(_) => RunOutput::Text(content),
        }
    }
}

#[async_trait]
impl AgentRuntime for ReActRuntime {
    async fn run(
        &self,
        agent: &Agent,
        input: &str,
        session: Option<&Session>,
    ) -> AgentResult<RunOutput> {
        let history = match session {
            Some(session) => session.history().await?,
            None => Vec::new(),
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&agent.instructions));
        messages.extend(history);

        // Everything produced during this turn, persisted once it completes
        let mut turn = vec![Message::user(input)];
        messages.push(Message::user(input));

        let (tools, routes) = Self::collect_tools(agent).await?;

        for iteration in 0..self.max_turns {
            tracing::debug!("Agent {} iteration {}", agent.name, iteration + 1);

            let request = CompletionRequest {
                messages: messages.clone(),
                model: Some(agent.model.clone()),
                tools: if tools.is_empty() {
                    None
                } else {
                    Some(tools.clone())
                },
                response_format: agent.output_schema.clone(),
                ..Default::default()
            };

            let response = self.llm.complete(request).await?;
            let message = response.message;
            let tool_calls = message.requested_tool_calls().to_vec();

            if tool_calls.is_empty() {
                let content = message.content.clone();
                turn.push(message);
                if let Some(session) = session {
                    session.append(&turn).await?;
                }
                return Ok(Self::final_output(agent, content));
            }

            messages.push(message.clone());
            turn.push(message);

            for call in &tool_calls {
                let result = Self::execute_tool_call(&routes, call).await;
                let tool_message = Message::tool_result(&call.id, result);
                messages.push(tool_message.clone());
                turn.push(tool_message);
            }
        }

        Err(AgentError::MaxIterations(self.max_turns))
    }
}
