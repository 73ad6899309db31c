//! List tools.
//!
//! Tools: lrange_list, lpush_list, rpush_list, get_list_length, get_list_index,
//!        lpop_list, rpop_list, lset_list, ltrim_list

use serde::Serialize;

use crate::client::{ListEnd, SharedClient};
use crate::encoding::{safe_optional, safe_slice, SafeValue};
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, or_one, require_items, require_non_empty};

tool_input! {
    struct ListKeyInput {
        #[field("key", "required,description=List key")]
        key: String,
    }
}

tool_input! {
    struct RangeInput {
        #[field("key", "required,description=List key")]
        key: String,
        #[field("start", "required,description=Start index (0-based, negative for from-end)")]
        start: i64,
        #[field("stop", "required,description=Stop index (inclusive, negative for from-end)")]
        stop: i64,
    }
}

tool_input! {
    struct LpushInput {
        #[field("key", "required,description=List key")]
        key: String,
        #[field("values", "required,minItems=1,description=Values to push to the left")]
        values: Vec<String>,
    }
}

tool_input! {
    struct RpushInput {
        #[field("key", "required,description=List key")]
        key: String,
        #[field("values", "required,minItems=1,description=Values to push to the right")]
        values: Vec<String>,
    }
}

tool_input! {
    struct IndexInput {
        #[field("key", "required,description=List key")]
        key: String,
        #[field("index", "required,description=Index (0-based, negative for from-end)")]
        index: i64,
    }
}

tool_input! {
    struct PopInput {
        #[field("key", "required,description=List key")]
        key: String,
        #[field("count", "description=Number of elements to pop (default: 1)")]
        count: i64,
    }
}

tool_input! {
    struct LsetInput {
        #[field("key", "required,description=List key")]
        key: String,
        #[field("index", "required,description=Index (0-based, negative for from-end)")]
        index: i64,
        #[field("value", "required,description=Value to set")]
        value: String,
    }
}

#[derive(Debug, Serialize)]
struct RangeOutput {
    key: String,
    values: Vec<SafeValue>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct PushOutput {
    key: String,
    list_length: i64,
    values: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LengthOutput {
    key: String,
    length: i64,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct IndexOutput {
    key: String,
    index: i64,
    value: SafeValue,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct PopOutput {
    key: String,
    elements: Vec<SafeValue>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct LsetOutput {
    key: String,
    index: i64,
    value: String,
    success: bool,
}

#[derive(Debug, Serialize)]
struct TrimOutput {
    key: String,
    start: i64,
    stop: i64,
    success: bool,
}

/// Register the list tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "lrange_list",
        "Get a range of elements from a list",
        client,
        lrange_list,
    ));
    registry.must_register(command_tool(
        "lpush_list",
        "Push values to the left (head) of a list",
        client,
        |client, input: LpushInput| push(client, input.key, input.values, ListEnd::Head),
    ));
    registry.must_register(command_tool(
        "rpush_list",
        "Push values to the right (tail) of a list",
        client,
        |client, input: RpushInput| push(client, input.key, input.values, ListEnd::Tail),
    ));
    registry.must_register(command_tool(
        "get_list_length",
        "Get the number of elements in a list",
        client,
        get_list_length,
    ));
    registry.must_register(command_tool(
        "get_list_index",
        "Get an element from a list by index",
        client,
        get_list_index,
    ));
    registry.must_register(command_tool(
        "lpop_list",
        "Remove and return elements from the left (head) of a list",
        client,
        |client, input: PopInput| pop(client, input, ListEnd::Head),
    ));
    registry.must_register(command_tool(
        "rpop_list",
        "Remove and return elements from the right (tail) of a list",
        client,
        |client, input: PopInput| pop(client, input, ListEnd::Tail),
    ));
    registry.must_register(command_tool(
        "lset_list",
        "Set the value of an element in a list by index",
        client,
        lset_list,
    ));
    registry.must_register(command_tool(
        "ltrim_list",
        "Trim a list to keep only elements within a range",
        client,
        ltrim_list,
    ));
}

async fn lrange_list(client: SharedClient, input: RangeInput) -> Result<RangeOutput> {
    require_non_empty(&input.key, "key")?;
    let values = client
        .lrange(&input.key, input.start, input.stop)
        .await
        .map_err(|e| {
            McpError::upstream(
                format!("failed to get list range for key {:?}", input.key),
                e,
            )
        })?;
    Ok(RangeOutput {
        key: input.key,
        count: values.len(),
        values: safe_slice(values),
    })
}

async fn push(
    client: SharedClient,
    key: String,
    values: Vec<String>,
    end: ListEnd,
) -> Result<PushOutput> {
    require_non_empty(&key, "key")?;
    require_items(&values, "at least one value must be provided")?;
    let list_length = client
        .push(&key, &values, end)
        .await
        .map_err(|e| McpError::upstream(format!("failed to push to list {:?}", key), e))?;
    Ok(PushOutput {
        key,
        list_length,
        values,
    })
}

async fn get_list_length(client: SharedClient, input: ListKeyInput) -> Result<LengthOutput> {
    require_non_empty(&input.key, "key")?;
    let length = client.llen(&input.key).await.map_err(|e| {
        McpError::upstream(
            format!("failed to get list length for key {:?}", input.key),
            e,
        )
    })?;
    Ok(LengthOutput {
        key: input.key,
        length,
        exists: length > 0,
    })
}

async fn get_list_index(client: SharedClient, input: IndexInput) -> Result<IndexOutput> {
    require_non_empty(&input.key, "key")?;
    let value = client.lindex(&input.key, input.index).await.map_err(|e| {
        McpError::upstream(
            format!("failed to get list element for key {:?}", input.key),
            e,
        )
    })?;
    Ok(IndexOutput {
        key: input.key,
        index: input.index,
        exists: value.is_some(),
        value: safe_optional(value),
    })
}

async fn pop(client: SharedClient, input: PopInput, end: ListEnd) -> Result<PopOutput> {
    require_non_empty(&input.key, "key")?;
    let elements = client
        .pop(&input.key, or_one(input.count), end)
        .await
        .map_err(|e| McpError::upstream(format!("failed to pop from list {:?}", input.key), e))?;
    Ok(PopOutput {
        key: input.key,
        count: elements.len(),
        elements: safe_slice(elements),
    })
}

async fn lset_list(client: SharedClient, input: LsetInput) -> Result<LsetOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.value, "value")?;
    client
        .lset(&input.key, input.index, &input.value)
        .await
        .map_err(|e| {
            McpError::upstream(
                format!(
                    "failed to set list element for key {:?} at index {}",
                    input.key, input.index
                ),
                e,
            )
        })?;
    Ok(LsetOutput {
        key: input.key,
        index: input.index,
        value: input.value,
        success: true,
    })
}

async fn ltrim_list(client: SharedClient, input: RangeInput) -> Result<TrimOutput> {
    require_non_empty(&input.key, "key")?;
    client
        .ltrim(&input.key, input.start, input.stop)
        .await
        .map_err(|e| McpError::upstream(format!("failed to trim list {:?}", input.key), e))?;
    Ok(TrimOutput {
        key: input.key,
        start: input.start,
        stop: input.stop,
        success: true,
    })
}
