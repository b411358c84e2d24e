//! Errors raised by the server itself, outside the core error set.

use precache_core::ConfigError;
use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the precache MCP server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration needed by a tool is missing or invalid.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// A tool output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ServerError> for McpError {
    fn from(err: ServerError) -> Self {
        let code = match &err {
            ServerError::Config(_) => -32602,
            ServerError::Serialize(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_maps_to_invalid_params() {
        let err = ServerError::Config(ConfigError::Missing { field: "origin".into(), hint: "set it".into() });
        let mcp: McpError = err.into();
        assert_eq!(mcp.code, ErrorCode(-32602));
        assert!(mcp.message.starts_with("CONFIG_ERROR"));
    }
}
