use crate::mcp::errors::{JsonRpcError, MCPError, MCPResult, ProtocolError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 message structure for MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPMessage {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Request message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl MCPMessage {
    const JSONRPC_VERSION: &'static str = "2.0";

    /// Create a new response message
    pub fn response(id: Value, result: Option<Value>) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result,
            error: None,
        }
    }

    /// Create a new error response message
    pub fn error_response(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    /// Check if this is a request message
    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }

    /// Check if this is a response message
    pub fn is_response(&self) -> bool {
        self.id.is_some()
            && self.method.is_none()
            && (self.result.is_some() || self.error.is_some())
    }

    /// Check if this is a notification message
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    /// Validate the message structure
    pub fn validate(&self) -> MCPResult<()> {
        if self.jsonrpc != Self::JSONRPC_VERSION {
            return Err(MCPError::Protocol(ProtocolError::InvalidMessage(format!(
                "Invalid JSON-RPC version: {}",
                self.jsonrpc
            ))));
        }

        if self.is_request() {
            if self.result.is_some() || self.error.is_some() {
                return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                    "Request message cannot have result or error fields".to_string(),
                )));
            }
        } else if self.is_response() {
            if self.method.is_some() || self.params.is_some() {
                return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                    "Response message cannot have method or params fields".to_string(),
                )));
            }
            if self.result.is_some() && self.error.is_some() {
                return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                    "Response cannot have both result and error".to_string(),
                )));
            }
        } else if self.is_notification() {
            if self.result.is_some() || self.error.is_some() {
                return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                    "Notification message cannot have result or error fields".to_string(),
                )));
            }
        } else {
            return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                "Message does not match any valid type (request, response, notification)"
                    .to_string(),
            )));
        }

        Ok(())
    }

    /// Convert to typed request
    pub fn as_request(&self) -> MCPResult<MCPRequest> {
        match (&self.id, &self.method) {
            (Some(id), Some(method)) => Ok(MCPRequest {
                jsonrpc: self.jsonrpc.clone(),
                id: id.clone(),
                method: method.clone(),
                params: self.params.clone(),
            }),
            _ => Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                "Message is not a request".to_string(),
            ))),
        }
    }
}

/// Server capabilities advertised during initialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Protocol message parser for the newline-delimited stdio stream
pub struct MessageParser;

impl MessageParser {
    /// Parse a message from one line of JSON
    pub fn parse_message(data: &str) -> MCPResult<MCPMessage> {
        let message: MCPMessage = serde_json::from_str(data)
            .map_err(|e| MCPError::Protocol(ProtocolError::ParseError(e.to_string())))?;

        message.validate()?;
        Ok(message)
    }

    /// Serialize a message to a single JSON line (no embedded newlines)
    pub fn serialize_message(message: &MCPMessage) -> MCPResult<String> {
        message.validate()?;
        serde_json::to_string(message)
            .map_err(|e| MCPError::Protocol(ProtocolError::InternalError(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::errors::JsonRpcErrorCode;
    use serde_json::json;

    #[test]
    fn test_response_message() {
        let msg = MCPMessage::response(json!("test-id"), Some(json!({"result": "success"})));
        assert!(!msg.is_request());
        assert!(msg.is_response());
        assert!(!msg.is_notification());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_error_response_message() {
        let error = JsonRpcError::new(JsonRpcErrorCode::MethodNotFound, "nope");
        let msg = MCPMessage::error_response(json!(1), error);
        assert!(msg.is_response());
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_message_parsing() {
        let json_data = r#"{"jsonrpc":"2.0","id":"1","method":"tools/list","params":{}}"#;
        let message = MessageParser::parse_message(json_data).unwrap();
        assert!(message.is_request());
        assert_eq!(message.method.as_deref(), Some("tools/list"));
    }

    #[test]
    fn test_notification_parsing() {
        let json_data = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let message = MessageParser::parse_message(json_data).unwrap();
        assert!(message.is_notification());
    }

    #[test]
    fn test_invalid_version_rejected() {
        let json_data = r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#;
        assert!(MessageParser::parse_message(json_data).is_err());
    }

    #[test]
    fn test_request_with_result_rejected() {
        let json_data = r#"{"jsonrpc":"2.0","id":1,"method":"ping","result":{}}"#;
        assert!(MessageParser::parse_message(json_data).is_err());
    }

    #[test]
    fn test_serialized_message_is_single_line() {
        let msg = MCPMessage::response(json!(7), Some(json!({"tools": []})));
        let line = MessageParser::serialize_message(&msg).unwrap();
        assert!(!line.contains('\n'));
    }
}
