//! Conversational agent runtime
//!
//! - `domain/` - Agent definition, messages, tool calls, sessions
//! - `llm/` - LLM provider port and the OpenAI implementation
//! - `core/` - The ReAct tool-calling runtime
//! - `memory/` - Session persistence backends

pub mod core;
pub mod domain;
pub mod error;
pub mod llm;
pub mod memory;

pub use domain::*;
pub use error::*;
