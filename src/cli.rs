use clap::Parser;
use std::path::PathBuf;

/// Middle-layer HTTP service between chat clients and a knowledge-base MCP server
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "kb-bridge", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "KB_BRIDGE_CONFIG", default_value = "kb-bridge.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// URL of the knowledge-base MCP server
    #[arg(long, env = "MCP_SERVER_URL")]
    pub mcp_server_url: Option<String>,

    /// Supabase project URL forwarded to the MCP server
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase service key forwarded to the MCP server
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_service_key: Option<String>,

    /// OpenAI API key, used by the agent and forwarded to the MCP server
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Model used by the agents
    #[arg(long, env = "KB_BRIDGE_MODEL")]
    pub model: Option<String>,

    /// Path to the system prompt file
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt: Option<PathBuf>,

    /// Session database URL
    #[arg(long, env = "SESSION_DATABASE_URL")]
    pub session_db: Option<String>,
}
