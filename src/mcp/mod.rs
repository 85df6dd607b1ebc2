pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;

// Re-export core types for easier access
pub use self::server::MCPServer;

/// MCP protocol version implemented by this server
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server information
pub const SERVER_NAME: &str = "jira-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
