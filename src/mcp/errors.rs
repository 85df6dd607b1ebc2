use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error handling for MCP server operations
pub type MCPResult<T> = Result<T, MCPError>;

/// Main error type for all MCP operations
#[derive(Debug, thiserror::Error)]
pub enum MCPError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Protocol-level errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON-RPC message: {0}")]
    InvalidMessage(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Standard JSON-RPC 2.0 error codes
#[derive(Debug, Clone, Copy)]
pub enum JsonRpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

/// JSON-RPC error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
        }
    }
}

impl From<MCPError> for JsonRpcError {
    fn from(error: MCPError) -> Self {
        match error {
            MCPError::Protocol(ProtocolError::MethodNotFound(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::MethodNotFound, msg)
            }
            MCPError::Protocol(ProtocolError::InvalidParams(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidParams, msg)
            }
            MCPError::Protocol(ProtocolError::ParseError(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::ParseError, msg)
            }
            MCPError::Protocol(ProtocolError::InvalidMessage(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidRequest, msg)
            }
            _ => JsonRpcError::new(JsonRpcErrorCode::InternalError, error.to_string()),
        }
    }
}

impl From<ProtocolError> for JsonRpcError {
    fn from(error: ProtocolError) -> Self {
        MCPError::Protocol(error).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_found_maps_to_standard_code() {
        let error: JsonRpcError =
            ProtocolError::MethodNotFound("tools/unknown".to_string()).into();
        assert_eq!(error.code, -32601);
        assert!(error.message.contains("tools/unknown"));
    }

    #[test]
    fn parse_error_maps_to_standard_code() {
        let error: JsonRpcError = ProtocolError::ParseError("bad json".to_string()).into();
        assert_eq!(error.code, -32700);
    }

    #[test]
    fn internal_errors_fall_through() {
        let error: JsonRpcError = MCPError::Internal("boom".to_string()).into();
        assert_eq!(error.code, -32603);
    }
}
