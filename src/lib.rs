//! # valkey-mcp
//!
//! MCP (Model Context Protocol) server for Valkey.
//!
//! This crate exposes Valkey commands as tools for AI agents. It implements
//! the MCP protocol over stdin/stdout using JSON-RPC 2.0.
//!
//! ## Features
//!
//! - **71 tools** covering strings, keys, hashes, lists, sets, streams,
//!   server introspection, configuration, cluster and Lua scripting
//! - **Declared input schemas**: every tool's JSON Schema is derived from its
//!   input struct
//! - **Binary safety**: values that are not valid UTF-8 are returned as base64
//! - **Cancellation**: each call runs on its own task and honors
//!   `notifications/cancelled`
//!
//! ## Usage
//!
//! The server is typically run as an executable and configured in an MCP host:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "valkey": {
//!       "command": "/path/to/valkey-mcp",
//!       "args": ["--url", "valkey://localhost:6379"]
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use valkey_mcp::{tools, McpServer, RedisClient, SharedClient, ToolRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client: SharedClient = Arc::new(RedisClient::connect("redis://localhost:6379").await?);
//! let mut registry = ToolRegistry::new();
//! tools::register_all(&mut registry, &client);
//!
//! let mut server = McpServer::new();
//! registry.register_with_server(&mut server)?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod registry;
pub mod server;
pub mod tools;

pub use client::{RedisClient, SharedClient, ValkeyClient, ValkeyError};
pub use config::{ConnectionConfig, DbIndex, ValkeyUrl};
pub use encoding::SafeValue;
pub use error::{McpError, Result};
pub use registry::{ToolInfo, ToolRegistry};
pub use server::{JsonRpcRequest, JsonRpcResponse, McpServer, ToolDef};
pub use tools::{Tool, ToolContext};
