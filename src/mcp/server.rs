/// MCP server over stdio.
///
/// Reads newline-delimited JSON-RPC 2.0 from stdin and writes responses to
/// stdout; all logging goes to stderr so the protocol stream stays clean.
/// The Jira client is injected at construction and shared immutably.
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::jira::IssueTracker;
use crate::mcp::errors::{JsonRpcError, MCPResult, ProtocolError};
use crate::mcp::protocol::{
    InitializeResult, MCPMessage, MCPRequest, MessageParser, ServerCapabilities, ServerInfo,
    ToolsCapability,
};
use crate::mcp::tools;
use crate::mcp::{MCP_PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};

pub struct MCPServer {
    tracker: Arc<dyn IssueTracker>,
    settings: Settings,
}

impl MCPServer {
    pub fn new(tracker: Arc<dyn IssueTracker>, settings: Settings) -> Self {
        Self { tracker, settings }
    }

    /// Serve requests from stdin until EOF.
    pub async fn run(&self) -> MCPResult<()> {
        info!(
            protocol = MCP_PROTOCOL_VERSION,
            server = SERVER_NAME,
            version = SERVER_VERSION,
            "MCP server listening on stdio"
        );

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(line).await {
                let serialized = MessageParser::serialize_message(&response)?;
                stdout.write_all(serialized.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Process one line; `None` means no response is owed (notification).
    pub async fn handle_line(&self, line: &str) -> Option<MCPMessage> {
        let message = match MessageParser::parse_message(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "rejecting malformed message");
                return Some(MCPMessage::error_response(Value::Null, e.into()));
            }
        };

        if message.is_notification() {
            let method = message.method.as_deref().unwrap_or_default();
            debug!(method, "notification received");
            return None;
        }

        let request = match message.as_request() {
            Ok(request) => request,
            Err(e) => {
                return Some(MCPMessage::error_response(
                    message.id.unwrap_or(Value::Null),
                    e.into(),
                ));
            }
        };

        Some(self.handle_request(request).await)
    }

    async fn handle_request(&self, request: MCPRequest) -> MCPMessage {
        debug!(method = %request.method, "handling request");

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.as_ref()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::catalog() })),
            "tools/call" => self.handle_tool_call(request.params.as_ref()).await,
            other => Err(ProtocolError::MethodNotFound(other.to_string())),
        };

        match result {
            Ok(value) => MCPMessage::response(request.id, Some(value)),
            Err(e) => {
                error!(method = %request.method, error = %e, "request failed");
                MCPMessage::error_response(request.id, JsonRpcError::from(e))
            }
        }
    }

    fn handle_initialize(&self, params: Option<&Value>) -> Result<Value, ProtocolError> {
        let client_name = params
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client = client_name, "initializing session");

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        serde_json::to_value(result).map_err(|e| ProtocolError::InternalError(e.to_string()))
    }

    async fn handle_tool_call(&self, params: Option<&Value>) -> Result<Value, ProtocolError> {
        let params = params.ok_or_else(|| {
            ProtocolError::InvalidParams("tools/call requires params".to_string())
        })?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidParams("missing tool name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        let content =
            tools::dispatch(name, &arguments, self.tracker.as_ref(), &self.settings).await;

        Ok(json!({
            "content": content,
            "isError": false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::testing::{test_settings, MockTracker};

    fn server_with(tracker: MockTracker) -> MCPServer {
        MCPServer::new(Arc::new(tracker), test_settings(None))
    }

    #[tokio::test]
    async fn initialize_reports_identity_and_capabilities() {
        let server = server_with(MockTracker::default());

        let response = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"host","version":"1.0"}}}"#,
            )
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn initialized_notification_gets_no_response() {
        let server = server_with(MockTracker::default());
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let server = server_with(MockTracker::default());
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn tools_list_publishes_catalog() {
        let server = server_with(MockTracker::default());
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 15);
    }

    #[tokio::test]
    async fn unknown_method_is_json_rpc_error() {
        let server = server_with(MockTracker::default());
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn malformed_line_is_parse_error() {
        let server = server_with(MockTracker::default());
        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn tool_call_failure_is_still_a_successful_transport_response() {
        // Unstubbed tracker: the handler fails, but the JSON-RPC response
        // succeeds and carries the failure payload in the content block.
        let server = server_with(MockTracker::default());
        let response = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"get_ticket","arguments":{"ticket_key":"PROJ-1"}}}"#,
            )
            .await
            .unwrap();

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);

        let text = result["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"]["tool"], "get_ticket");
    }

    #[tokio::test]
    async fn tool_call_without_name_is_invalid_params() {
        let server = server_with(MockTracker::default());
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32602);
    }
}
