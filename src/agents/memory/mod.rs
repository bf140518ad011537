//! Conversation persistence for agent sessions
//!
//! Two backends are available:
//! - SQLite through sqlx (default, survives restarts)
//! - In-memory (tests and ephemeral deployments)

mod in_memory;
mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::agents::domain::Message;
use crate::agents::error::AgentResult;
use crate::config::{SessionBackend, SessionSettings};

/// Trait for conversation storage backends
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load every message of a session, oldest first. Unknown sessions are empty.
    async fn load(&self, session_id: &str) -> AgentResult<Vec<Message>>;

    /// Append messages to a session, creating it if needed
    async fn append(&self, session_id: &str, messages: &[Message]) -> AgentResult<()>;
}

/// Create a conversation store from configuration
pub async fn create_store(settings: &SessionSettings) -> AgentResult<Arc<dyn ConversationStore>> {
    match settings.backend {
        SessionBackend::InMemory => Ok(Arc::new(InMemoryStore::new())),
        SessionBackend::Sqlite => {
            let store = SqliteStore::connect(&settings.url, settings.max_connections).await?;
            Ok(Arc::new(store))
        }
    }
}
