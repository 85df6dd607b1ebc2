pub mod analysis;
pub mod config;
pub mod jira;
pub mod jql;
pub mod mcp;
pub mod ticket;
