//! Server tools.
//!
//! Tools: server_info, server_ping, client_list, dbsize, slowlog_get

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use crate::client::reply::{count_clients, parse_info};
use crate::client::{SharedClient, SlowlogEntry};
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, NoInput};

tool_input! {
    struct EmptyInput {}
}

tool_input! {
    struct SlowlogInput {
        #[field("count", "description=Number of slowlog entries to retrieve (0 for all)")]
        count: i64,
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    info: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct PingOutput {
    alive: bool,
    latency_ms: f64,
    message: String,
}

#[derive(Debug, Serialize)]
struct ClientListOutput {
    client_count: usize,
    raw_info: String,
}

#[derive(Debug, Serialize)]
struct DbsizeOutput {
    size: i64,
}

#[derive(Debug, Serialize)]
struct SlowlogOutput {
    entries: Vec<SlowlogEntry>,
    count: usize,
}

/// Register the server tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "server_info",
        "Get server information and statistics",
        client,
        server_info,
    ));
    registry.must_register(command_tool(
        "server_ping",
        "Test connectivity to Valkey server and measure latency",
        client,
        server_ping,
    ));
    registry.must_register(command_tool(
        "client_list",
        "List all client connections to the Valkey server",
        client,
        client_list,
    ));
    registry.must_register(command_tool(
        "dbsize",
        "Get the number of keys in the current database",
        client,
        dbsize,
    ));
    registry.must_register(command_tool(
        "slowlog_get",
        "Get slow query log entries from Redis/Valkey server",
        client,
        slowlog_get,
    ));
}

async fn server_info(client: SharedClient, _input: NoInput) -> Result<InfoOutput> {
    let text = client
        .info()
        .await
        .map_err(|e| McpError::upstream("failed to get server info", e))?;
    Ok(InfoOutput {
        info: parse_info(&text),
    })
}

/// A failed ping is reported in the output, not as an error.
async fn server_ping(client: SharedClient, _input: NoInput) -> Result<PingOutput> {
    let start = Instant::now();
    let result = client.ping().await;
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    Ok(match result {
        Ok(()) => PingOutput {
            alive: true,
            latency_ms,
            message: "Server is responding".to_string(),
        },
        Err(err) => PingOutput {
            alive: false,
            latency_ms,
            message: err.to_string(),
        },
    })
}

async fn client_list(client: SharedClient, _input: EmptyInput) -> Result<ClientListOutput> {
    let raw_info = client
        .client_list()
        .await
        .map_err(|e| McpError::upstream("failed to list clients", e))?;
    Ok(ClientListOutput {
        client_count: count_clients(&raw_info),
        raw_info,
    })
}

async fn dbsize(client: SharedClient, _input: EmptyInput) -> Result<DbsizeOutput> {
    let size = client
        .dbsize()
        .await
        .map_err(|e| McpError::upstream("failed to get database size", e))?;
    Ok(DbsizeOutput { size })
}

async fn slowlog_get(client: SharedClient, input: SlowlogInput) -> Result<SlowlogOutput> {
    let count = (input.count > 0).then_some(input.count);
    let entries = client
        .slowlog_get(count)
        .await
        .map_err(|e| McpError::upstream("failed to get slowlog", e))?;
    Ok(SlowlogOutput {
        count: entries.len(),
        entries,
    })
}
