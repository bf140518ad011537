pub mod agent_factory;
pub mod api_handler;
pub mod health_handler;
pub mod mcp_client;
pub mod upload;
