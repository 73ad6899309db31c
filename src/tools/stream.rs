//! Stream tools.
//!
//! Entries are returned as flat maps with the entry id under `_id`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::client::SharedClient;
use crate::encoding::{safe_stream_entries, SafeValue};
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, require_non_empty};

const AUTO_ID: &str = "*";

tool_input! {
    struct XaddInput {
        #[field("key", "required,description=Stream key")]
        key: String,
        #[field("id", "description=Stream entry ID (* for auto-generate, defaults to *)")]
        id: String,
        #[field("fields", "required,description=Field-value pairs")]
        fields: BTreeMap<String, String>,
    }
}

tool_input! {
    struct XrangeInput {
        #[field("key", "required,description=Stream key")]
        key: String,
        #[field("start", "required,description=Start ID (- for first entry)")]
        start: String,
        #[field("end", "required,description=End ID (+ for last entry)")]
        end: String,
        #[field("count", "description=Maximum entries to return (0 for all)")]
        count: i64,
    }
}

tool_input! {
    struct XlenInput {
        #[field("key", "required,description=Stream key")]
        key: String,
    }
}

tool_input! {
    struct XreadInput {
        #[field("key", "required,description=Stream key")]
        key: String,
        #[field("id", "required,description=Start ID ($ for new entries, 0 for first)")]
        id: String,
        #[field("count", "description=Maximum entries to return (0 for all)")]
        count: i64,
    }
}

#[derive(Debug, Serialize)]
struct XaddOutput {
    id: String,
}

#[derive(Debug, Serialize)]
struct EntriesOutput {
    entries: Vec<BTreeMap<String, SafeValue>>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct XlenOutput {
    count: i64,
}

/// Register the stream tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "xadd_stream",
        "Add entry to stream with specified fields",
        client,
        xadd_stream,
    ));
    registry.must_register(command_tool(
        "xrange_stream",
        "Get stream entries in ID range",
        client,
        xrange_stream,
    ));
    registry.must_register(command_tool(
        "xlen_stream",
        "Get number of entries in stream",
        client,
        xlen_stream,
    ));
    registry.must_register(command_tool(
        "xread_stream",
        "Read entries from stream starting at ID",
        client,
        xread_stream,
    ));
}

/// Zero or negative means "no limit".
fn limit(count: i64) -> Option<i64> {
    (count > 0).then_some(count)
}

async fn xadd_stream(client: SharedClient, input: XaddInput) -> Result<XaddOutput> {
    require_non_empty(&input.key, "key")?;
    if input.fields.is_empty() {
        return Err(McpError::validation("fields cannot be empty"));
    }
    let id = if input.id.is_empty() {
        AUTO_ID
    } else {
        input.id.as_str()
    };
    let id = client
        .xadd(&input.key, id, &input.fields)
        .await
        .map_err(|e| McpError::upstream("failed to add stream entry", e))?;
    Ok(XaddOutput { id })
}

async fn xrange_stream(client: SharedClient, input: XrangeInput) -> Result<EntriesOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.start, "start")?;
    require_non_empty(&input.end, "end")?;
    let entries = client
        .xrange(&input.key, &input.start, &input.end, limit(input.count))
        .await
        .map_err(|e| McpError::upstream("failed to get stream range", e))?;
    Ok(EntriesOutput {
        count: entries.len(),
        entries: safe_stream_entries(entries),
    })
}

async fn xlen_stream(client: SharedClient, input: XlenInput) -> Result<XlenOutput> {
    require_non_empty(&input.key, "key")?;
    let count = client
        .xlen(&input.key)
        .await
        .map_err(|e| McpError::upstream("failed to get stream length", e))?;
    Ok(XlenOutput { count })
}

async fn xread_stream(client: SharedClient, input: XreadInput) -> Result<EntriesOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.id, "id")?;
    let entries = client
        .xread(&input.key, &input.id, limit(input.count))
        .await
        .map_err(|e| McpError::upstream("failed to read stream", e))?;
    Ok(EntriesOutput {
        count: entries.len(),
        entries: safe_stream_entries(entries),
    })
}
