//! Error types for the MCP server.
//!
//! Errors gain context on the way up: the client reports which command
//! failed, tools add the operation and key, and the registry names the tool.

use crate::client::ValkeyError;

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// A tool with the same name is already registered.
    #[error("tool {0} already registered")]
    DuplicateTool(String),

    /// Unknown tool requested.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// A tool ran and failed.
    #[error("failed to execute tool {name}: {source}")]
    ToolFailed {
        /// Tool name
        name: String,
        /// Underlying failure
        #[source]
        source: Box<McpError>,
    },

    /// The tool has no execute behavior of its own.
    #[error("execute not implemented for tool {0}")]
    NotImplemented(String),

    /// Raw input could not be decoded into the tool's parameters.
    #[error("invalid input format: {0}")]
    InvalidInput(String),

    /// Input decoded but violates a tool-level rule.
    #[error("{0}")]
    Validation(String),

    /// The database rejected or failed a command.
    #[error("{context}: {source}")]
    Upstream {
        /// What the tool was doing
        context: String,
        /// Client error
        #[source]
        source: ValkeyError,
    },

    /// The caller cancelled the request.
    #[error("tool call cancelled")]
    Cancelled,

    /// Invalid startup configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Wrap a client error with the operation that triggered it.
    pub fn upstream(context: impl Into<String>, source: ValkeyError) -> Self {
        McpError::Upstream {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        McpError::Validation(message.into())
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        McpError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Protocol(format!("JSON error: {}", err))
    }
}

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl McpError {
    /// Convert to JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            McpError::ToolNotFound(_) => rpc_codes::METHOD_NOT_FOUND,
            McpError::InvalidInput(_) | McpError::Validation(_) => rpc_codes::INVALID_PARAMS,
            McpError::Protocol(_) => rpc_codes::INVALID_REQUEST,
            McpError::ToolFailed { source, .. } => source.rpc_code(),
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;
