//! Hash tools.
//!
//! Tools: get_hash, set_hash, get_hash_field, get_hash_fields, hmget_hash,
//!        delete_hash_field, hash_field_exists, incr_hash_field, hlen_hash,
//!        hkeys_hash, hvals_hash

use std::collections::BTreeMap;

use serde::Serialize;

use crate::client::SharedClient;
use crate::encoding::{safe_map, safe_optional, safe_slice, SafeValue};
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, or_one, require_items, require_non_empty};

tool_input! {
    struct HashKeyInput {
        #[field("key", "required,description=Hash key")]
        key: String,
    }
}

tool_input! {
    struct SetHashInput {
        #[field("key", "required,description=Hash key")]
        key: String,
        #[field("fields", "required,description=Fields to set")]
        fields: BTreeMap<String, String>,
    }
}

tool_input! {
    struct HashFieldInput {
        #[field("key", "required,description=Hash key")]
        key: String,
        #[field("field", "required,description=Field name")]
        field: String,
    }
}

tool_input! {
    struct GetFieldsInput {
        #[field("key", "required")]
        key: String,
        #[field("fields", "required,minItems=1")]
        fields: Vec<String>,
    }
}

tool_input! {
    struct HmgetInput {
        #[field("key", "required,description=Hash key")]
        key: String,
        #[field("fields", "required,description=Field names to retrieve")]
        fields: Vec<String>,
    }
}

tool_input! {
    struct DeleteFieldsInput {
        #[field("key", "required,description=Hash key")]
        key: String,
        #[field("fields", "required,minItems=1,description=Fields to delete")]
        fields: Vec<String>,
    }
}

tool_input! {
    struct FieldExistsInput {
        #[field("key", "required")]
        key: String,
        #[field("field", "required")]
        field: String,
    }
}

tool_input! {
    struct IncrFieldInput {
        #[field("key", "required")]
        key: String,
        #[field("field", "required")]
        field: String,
        #[field("amount", "description=Amount to increment (default: 1)")]
        amount: i64,
    }
}

#[derive(Debug, Serialize)]
struct GetHashOutput {
    key: String,
    fields: BTreeMap<String, SafeValue>,
    field_count: usize,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct SetHashOutput {
    key: String,
    fields_added: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct HashFieldOutput {
    key: String,
    field: String,
    value: SafeValue,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct FieldsOutput {
    key: String,
    fields: BTreeMap<String, SafeValue>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct HmgetOutput {
    key: String,
    result: BTreeMap<String, SafeValue>,
}

#[derive(Debug, Serialize)]
struct DeleteFieldsOutput {
    key: String,
    fields_deleted: i64,
    fields: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FieldExistsOutput {
    key: String,
    field: String,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct IncrFieldOutput {
    key: String,
    field: String,
    new_value: i64,
}

#[derive(Debug, Serialize)]
struct ResultOutput<T> {
    key: String,
    result: T,
}

/// Register the hash tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "get_hash",
        "Get all fields and values of a hash",
        client,
        get_hash,
    ));
    registry.must_register(command_tool(
        "set_hash",
        "Set multiple fields in a hash",
        client,
        set_hash,
    ));
    registry.must_register(command_tool(
        "get_hash_field",
        "Get the value of a specific field in a hash",
        client,
        get_hash_field,
    ));
    registry.must_register(command_tool(
        "get_hash_fields",
        "Get values for specific fields in a hash",
        client,
        get_hash_fields,
    ));
    registry.must_register(command_tool(
        "hmget_hash",
        "Get multiple hash fields at once",
        client,
        hmget_hash,
    ));
    registry.must_register(command_tool(
        "delete_hash_field",
        "Delete one or more fields from a hash",
        client,
        delete_hash_field,
    ));
    registry.must_register(command_tool(
        "hash_field_exists",
        "Check if a field exists in a hash",
        client,
        hash_field_exists,
    ));
    registry.must_register(command_tool(
        "incr_hash_field",
        "Increment a numeric field in a hash",
        client,
        incr_hash_field,
    ));
    registry.must_register(command_tool(
        "hlen_hash",
        "Get the number of fields in a hash",
        client,
        hlen_hash,
    ));
    registry.must_register(command_tool(
        "hkeys_hash",
        "Get all field names in a hash",
        client,
        hkeys_hash,
    ));
    registry.must_register(command_tool(
        "hvals_hash",
        "Get all values in a hash",
        client,
        hvals_hash,
    ));
}

/// Pair requested fields with HMGET slots, dropping absent ones.
fn present_fields(
    fields: Vec<String>,
    values: Vec<Option<Vec<u8>>>,
) -> BTreeMap<String, SafeValue> {
    let present = fields
        .into_iter()
        .zip(values)
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect();
    safe_map(present)
}

async fn get_hash(client: SharedClient, input: HashKeyInput) -> Result<GetHashOutput> {
    require_non_empty(&input.key, "key")?;
    let raw = client.hgetall(&input.key).await.map_err(|e| {
        McpError::upstream(format!("failed to get hash for key {:?}", input.key), e)
    })?;
    Ok(GetHashOutput {
        field_count: raw.len(),
        exists: !raw.is_empty(),
        fields: safe_map(raw),
        key: input.key,
    })
}

async fn set_hash(client: SharedClient, input: SetHashInput) -> Result<SetHashOutput> {
    require_non_empty(&input.key, "key")?;
    if input.fields.is_empty() {
        return Err(McpError::validation("at least one field must be provided"));
    }
    let fields_added = client.hset(&input.key, &input.fields).await.map_err(|e| {
        McpError::upstream(
            format!("failed to set hash fields for key {:?}", input.key),
            e,
        )
    })?;
    Ok(SetHashOutput {
        message: format!("Set {} field(s)", input.fields.len()),
        key: input.key,
        fields_added,
    })
}

async fn get_hash_field(client: SharedClient, input: HashFieldInput) -> Result<HashFieldOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.field, "field")?;
    let value = client.hget(&input.key, &input.field).await.map_err(|e| {
        McpError::upstream(
            format!("failed to get hash field for key {:?}", input.key),
            e,
        )
    })?;
    Ok(HashFieldOutput {
        exists: value.is_some(),
        value: safe_optional(value),
        key: input.key,
        field: input.field,
    })
}

async fn get_hash_fields(client: SharedClient, input: GetFieldsInput) -> Result<FieldsOutput> {
    require_non_empty(&input.key, "key")?;
    require_items(&input.fields, "at least one field must be provided")?;
    let values = client
        .hmget(&input.key, &input.fields)
        .await
        .map_err(|e| McpError::upstream("failed to get hash fields", e))?;
    let fields = present_fields(input.fields, values);
    Ok(FieldsOutput {
        key: input.key,
        count: fields.len(),
        fields,
    })
}

async fn hmget_hash(client: SharedClient, input: HmgetInput) -> Result<HmgetOutput> {
    require_non_empty(&input.key, "key")?;
    require_items(&input.fields, "fields cannot be empty")?;
    let values = client
        .hmget(&input.key, &input.fields)
        .await
        .map_err(|e| McpError::upstream("operation failed", e))?;
    Ok(HmgetOutput {
        key: input.key,
        result: present_fields(input.fields, values),
    })
}

async fn delete_hash_field(
    client: SharedClient,
    input: DeleteFieldsInput,
) -> Result<DeleteFieldsOutput> {
    require_non_empty(&input.key, "key")?;
    require_items(&input.fields, "at least one field must be provided")?;
    let fields_deleted = client.hdel(&input.key, &input.fields).await.map_err(|e| {
        McpError::upstream(
            format!("failed to delete hash fields for key {:?}", input.key),
            e,
        )
    })?;
    Ok(DeleteFieldsOutput {
        key: input.key,
        fields_deleted,
        fields: input.fields,
    })
}

async fn hash_field_exists(
    client: SharedClient,
    input: FieldExistsInput,
) -> Result<FieldExistsOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.field, "field")?;
    let exists = client
        .hexists(&input.key, &input.field)
        .await
        .map_err(|e| McpError::upstream("failed to check hash field", e))?;
    Ok(FieldExistsOutput {
        key: input.key,
        field: input.field,
        exists,
    })
}

async fn incr_hash_field(client: SharedClient, input: IncrFieldInput) -> Result<IncrFieldOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.field, "field")?;
    let new_value = client
        .hincr_by(&input.key, &input.field, or_one(input.amount))
        .await
        .map_err(|e| McpError::upstream("failed to increment hash field", e))?;
    Ok(IncrFieldOutput {
        key: input.key,
        field: input.field,
        new_value,
    })
}

async fn hlen_hash(client: SharedClient, input: HashKeyInput) -> Result<ResultOutput<i64>> {
    require_non_empty(&input.key, "key")?;
    let result = client
        .hlen(&input.key)
        .await
        .map_err(|e| McpError::upstream("operation failed", e))?;
    Ok(ResultOutput {
        key: input.key,
        result,
    })
}

async fn hkeys_hash(client: SharedClient, input: HashKeyInput) -> Result<ResultOutput<Vec<String>>> {
    require_non_empty(&input.key, "key")?;
    let result = client
        .hkeys(&input.key)
        .await
        .map_err(|e| McpError::upstream("operation failed", e))?;
    Ok(ResultOutput {
        key: input.key,
        result,
    })
}

async fn hvals_hash(
    client: SharedClient,
    input: HashKeyInput,
) -> Result<ResultOutput<Vec<SafeValue>>> {
    require_non_empty(&input.key, "key")?;
    let values = client
        .hvals(&input.key)
        .await
        .map_err(|e| McpError::upstream("operation failed", e))?;
    Ok(ResultOutput {
        key: input.key,
        result: safe_slice(values),
    })
}
