use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod validator;

use crate::cli::Cli;

/// Used when no system prompt file is present
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with access to a knowledge base containing documents and images uploaded by the user.";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub mcp: McpSettings,
    /// Credentials forwarded to the knowledge-base server
    #[serde(default)]
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Request body ceiling enforced by the HTTP layer
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

/// Remote knowledge-base tool server
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct McpSettings {
    pub server_url: String,
    /// Applies to connection setup and to each tool call
    #[serde(default = "default_mcp_timeout")]
    pub timeout_seconds: u64,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000/mcp".to_string(),
            timeout_seconds: default_mcp_timeout(),
        }
    }
}

fn default_mcp_timeout() -> u64 {
    120
}

#[derive(Default, Deserialize, Serialize, Clone)]
pub struct CredentialSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supabase_service_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
}

impl std::fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("CredentialSettings")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_service_key", &redact(&self.supabase_service_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Upper bound on model turns per agent run
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: None,
            max_turns: default_max_turns(),
            request_timeout_seconds: default_llm_timeout(),
        }
    }
}

fn default_max_turns() -> u32 {
    10
}

fn default_llm_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentSettings {
    pub system_prompt_path: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            system_prompt_path: PathBuf::from("system_prompt.txt"),
        }
    }
}

impl AgentSettings {
    /// Read the system prompt, falling back to [`DEFAULT_SYSTEM_PROMPT`]
    /// when the file is missing or blank.
    pub fn load_system_prompt(&self) -> String {
        match std::fs::read_to_string(&self.system_prompt_path) {
            Ok(contents) if !contents.trim().is_empty() => {
                tracing::info!(
                    "Loaded system prompt from {}",
                    self.system_prompt_path.display()
                );
                contents.trim().to_string()
            }
            Ok(_) => {
                tracing::warn!(
                    "System prompt file {} is empty, using default prompt",
                    self.system_prompt_path.display()
                );
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
            Err(_) => {
                tracing::warn!(
                    "{} not found, using default prompt",
                    self.system_prompt_path.display()
                );
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    Sqlite,
    InMemory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionSettings {
    pub backend: SessionBackend,
    pub url: String,
    #[serde(default = "default_session_connections")]
    pub max_connections: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Sqlite,
            url: "sqlite://conversation_history.db?mode=rwc".to_string(),
            max_connections: default_session_connections(),
        }
    }
}

fn default_session_connections() -> u32 {
    5
}

impl Settings {
    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::from_file(&cli.config)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        Self::validate(&settings)?;

        Ok(settings)
    }

    /// Load the optional TOML file on top of the built-in defaults
    pub fn from_file(path: &std::path::Path) -> Result<Self, anyhow::Error> {
        let defaults = Settings::default();

        let s = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("mcp.server_url", defaults.mcp.server_url)?
            .set_default("llm.model", defaults.llm.model)?
            .set_default("llm.base_url", defaults.llm.base_url)?
            .set_default(
                "agent.system_prompt_path",
                defaults.agent.system_prompt_path.to_string_lossy().to_string(),
            )?
            .set_default("session.backend", "sqlite")?
            .set_default("session.url", defaults.session.url)?
            .add_source(File::from(path.to_path_buf()).required(false))
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn validate(settings: &Settings) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(settings).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(url) = &cli.mcp_server_url {
            self.mcp.server_url = url.clone();
        }
        if let Some(url) = &cli.supabase_url {
            self.credentials.supabase_url = Some(url.clone());
        }
        if let Some(key) = &cli.supabase_service_key {
            self.credentials.supabase_service_key = Some(key.clone());
        }
        if let Some(key) = &cli.openai_api_key {
            self.credentials.openai_api_key = Some(key.clone());
        }
        if let Some(url) = &cli.openai_base_url {
            self.llm.base_url = url.clone();
        }
        if let Some(model) = &cli.model {
            self.llm.model = model.clone();
        }
        if let Some(path) = &cli.system_prompt {
            self.agent.system_prompt_path = path.clone();
        }
        if let Some(url) = &cli.session_db {
            self.session.url = url.clone();
        }
    }
}
