use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jira_mcp::config::Settings;
use jira_mcp::jira::client::JiraClient;
use jira_mcp::mcp::MCPServer;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    info!(
        jira_url = %settings.jira_url,
        auth_mode = if settings.auth.is_cloud() { "Cloud" } else { "Server" },
        user = settings.auth.principal(),
        "starting Jira MCP server"
    );

    let client = match JiraClient::new(settings.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let server = MCPServer::new(Arc::new(client), settings);
    if let Err(e) = server.run().await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
