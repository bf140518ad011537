//! SQLite conversation store

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::ConversationStore;
use crate::agents::domain::Message;
use crate::agents::error::AgentResult;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS agent_sessions (
        session_id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS agent_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL REFERENCES agent_sessions(session_id),
        message_data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_agent_messages_session ON agent_messages(session_id, id)",
];

/// Conversation store backed by a SQLite database
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database and create the session tables if needed
    pub async fn connect(url: &str, max_connections: u32) -> AgentResult<Self> {
        tracing::info!("Opening session database {}", url);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn load(&self, session_id: &str) -> AgentResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT message_data FROM agent_messages WHERE session_id = ? ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.try_get("message_data")?;
            messages.push(serde_json::from_str(&data)?);
        }

        Ok(messages)
    }

    async fn append(&self, session_id: &str, messages: &[Message]) -> AgentResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO agent_sessions (session_id, created_at, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(session_id) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(session_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for message in messages {
            let data = serde_json::to_string(message)?;
            sqlx::query(
                "INSERT INTO agent_messages (session_id, message_data, created_at) VALUES (?, ?, ?)",
            )
            .bind(session_id)
            .bind(&data)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
