//! Domain types for the agent runtime

mod agent;
mod message;
mod tool_call;

pub use agent::*;
pub use message::*;
pub use tool_call::*;

use async_trait::async_trait;

use crate::agents::error::AgentResult;

/// Port for running one agent turn
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run the agent on `input` until it produces a final output.
    ///
    /// When a session is given its history is loaded as context and the new
    /// turn is appended to it on success.
    async fn run(
        &self,
        agent: &Agent,
        input: &str,
        session: Option<&Session>,
    ) -> AgentResult<RunOutput>;
}
