use clap::Parser;
use kb_bridge::adapters::agent_factory::AgentFactory;
use kb_bridge::adapters::api_handler::ApiState;
use kb_bridge::adapters::mcp_client::McpConnector;
use kb_bridge::agents::core::ReActRuntime;
use kb_bridge::agents::llm::OpenAiProvider;
use kb_bridge::agents::memory::create_store;
use kb_bridge::cli::Cli;
use kb_bridge::config::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;
    info!("Starting middle layer server...");
    info!("MCP server: {}", settings.mcp.server_url);

    let sessions = create_store(&settings.session).await?;
    let system_prompt = settings.agent.load_system_prompt();

    let llm = OpenAiProvider::new(&settings.llm, settings.credentials.openai_api_key.clone())?;
    let runtime = ReActRuntime::new(Arc::new(llm), settings.llm.max_turns);

    let connector = McpConnector::new(&settings.mcp, &settings.credentials)?;
    let factory = AgentFactory::new(Arc::new(connector), system_prompt, settings.llm.model.clone());

    let state = ApiState {
        factory: Arc::new(factory),
        runtime: Arc::new(runtime),
        sessions,
    };
    let app = kb_bridge::create_app(state, settings.server.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down...");
}
