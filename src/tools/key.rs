//! Key management tools.
//!
//! Tools: scan_keys, keys_by_pattern, get_key_type, get_key_ttl, delete_keys,
//!        exists_key, expire_key, persist_key, rename_key, memory_usage,
//!        touch_keys, object_encoding, object_idletime, dump_key, restore_key

use std::collections::{BTreeSet, HashSet};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::client::SharedClient;
use crate::config::validate_pattern;
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, require_items, require_keys, require_non_empty};

const MATCH_ALL: &str = "*";
const NO_SUCH_KEY: &str = "none";
/// TTL reply for a missing key.
const TTL_MISSING: i64 = -2;

tool_input! {
    struct ScanInput {
        #[field("pattern", "description=Glob pattern to filter keys (default: *)")]
        pattern: String,
        #[field("count", "description=Approximate number of keys to return")]
        count: i64,
    }
}

tool_input! {
    struct PatternInput {
        #[field("pattern", "required,description=Key pattern to match (supports wildcards like * and ?)")]
        pattern: String,
    }
}

tool_input! {
    struct CheckKeyInput {
        #[field("key", "required,description=Key to check")]
        key: String,
    }
}

tool_input! {
    struct DeleteInput {
        #[field("keys", "required,minItems=1,description=Keys to delete")]
        keys: Vec<String>,
    }
}

tool_input! {
    struct ExistsInput {
        #[field("keys", "required,minItems=1,description=Array of keys to check for existence")]
        keys: Vec<String>,
    }
}

tool_input! {
    struct ExpireInput {
        #[field("key", "required,description=Key to expire")]
        key: String,
        #[field("seconds", "required,minimum=1,description=Seconds until expiration")]
        seconds: i64,
    }
}

tool_input! {
    struct PersistInput {
        #[field("key", "required,description=Key to persist")]
        key: String,
    }
}

tool_input! {
    struct RenameInput {
        #[field("key", "required,description=Current key name")]
        key: String,
        #[field("new_key", "required,description=New key name")]
        new_key: String,
    }
}

tool_input! {
    struct MemoryInput {
        #[field("key", "required,description=The key to get memory usage for")]
        key: String,
    }
}

tool_input! {
    struct TouchInput {
        #[field("keys", "required,description=List of keys to update access time for")]
        keys: Vec<String>,
    }
}

tool_input! {
    struct EncodingInput {
        #[field("key", "required,description=The key to get encoding type for")]
        key: String,
    }
}

tool_input! {
    struct IdleInput {
        #[field("key", "required,description=Key to check idle time for")]
        key: String,
    }
}

tool_input! {
    struct DumpInput {
        #[field("key", "required,description=Key to serialize")]
        key: String,
    }
}

tool_input! {
    struct RestoreInput {
        #[field("key", "required,description=Key to restore to")]
        key: String,
        #[field("ttl", "description=TTL in milliseconds (0 for no expiry)")]
        ttl: i64,
        #[field("serialized_value", "description=Base64-encoded serialized value (alternative to serialized)")]
        serialized_value: String,
        #[field("serialized", "description=Base64-encoded serialized value (alternative to serialized_value)")]
        serialized: String,
    }
}

#[derive(Debug, Serialize)]
struct ScanOutput {
    keys: Vec<String>,
    count: usize,
    pattern: String,
}

#[derive(Debug, Serialize)]
struct KeysOutput {
    keys: Vec<String>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct TypeOutput {
    key: String,
    #[serde(rename = "type")]
    key_type: String,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct TtlOutput {
    key: String,
    ttl_seconds: i64,
    has_expiry: bool,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    deleted_count: usize,
    keys: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ExistsOutput {
    count: i64,
}

#[derive(Debug, Serialize)]
struct ExpireOutput {
    key: String,
    seconds: i64,
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct PersistOutput {
    key: String,
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct RenameOutput {
    old_key: String,
    new_key: String,
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct MemoryOutput {
    bytes: i64,
    key: String,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct TouchOutput {
    count: usize,
    keys: Vec<String>,
    updated: i64,
}

#[derive(Debug, Serialize)]
struct EncodingOutput {
    encoding: String,
    key: String,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct IdleOutput {
    idle_time: i64,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct DumpOutput {
    serialized: String,
    size: usize,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct RestoreOutput {
    success: bool,
    message: String,
}

/// Register the key management tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "scan_keys",
        "Scan keys matching a pattern (non-blocking alternative to KEYS)",
        client,
        scan_keys,
    ));
    registry.must_register(command_tool(
        "keys_by_pattern",
        "Get keys matching a pattern in Valkey",
        client,
        keys_by_pattern,
    ));
    registry.must_register(command_tool(
        "get_key_type",
        "Get the data type of a key",
        client,
        get_key_type,
    ));
    registry.must_register(command_tool(
        "get_key_ttl",
        "Get the time-to-live (TTL) of a key in seconds",
        client,
        get_key_ttl,
    ));
    registry.must_register(command_tool(
        "delete_keys",
        "Delete one or more keys from Valkey",
        client,
        delete_keys,
    ));
    registry.must_register(command_tool(
        "exists_key",
        "Check if a key exists in Valkey",
        client,
        exists_key,
    ));
    registry.must_register(command_tool(
        "expire_key",
        "Set an expiration time (TTL) on a key",
        client,
        expire_key,
    ));
    registry.must_register(command_tool(
        "persist_key",
        "Remove the expiration timeout from a key (make it persistent)",
        client,
        persist_key,
    ));
    registry.must_register(command_tool(
        "rename_key",
        "Rename a key to a new name",
        client,
        rename_key,
    ));
    registry.must_register(command_tool(
        "memory_usage",
        "Get memory usage of a key in bytes",
        client,
        memory_usage,
    ));
    registry.must_register(command_tool(
        "touch_keys",
        "Update access time for multiple keys in Valkey",
        client,
        touch_keys,
    ));
    registry.must_register(command_tool(
        "object_encoding",
        "Get the encoding type of a key's value in Valkey",
        client,
        object_encoding,
    ));
    registry.must_register(command_tool(
        "object_idletime",
        "Get the idle time (time since last access) of a key in seconds",
        client,
        object_idletime,
    ));
    registry.must_register(command_tool(
        "dump_key",
        "Serialize value of key (returns base64-encoded serialization)",
        client,
        dump_key,
    ));
    registry.must_register(command_tool(
        "restore_key",
        "Restore serialized value to key (accepts base64-encoded serialization)",
        client,
        restore_key,
    ));
}

/// Walk the SCAN cursor until it wraps, or until `count` keys are collected
/// when a positive count is given. Keys reported twice by SCAN appear once.
async fn scan_keys(client: SharedClient, input: ScanInput) -> Result<ScanOutput> {
    let pattern = if input.pattern.is_empty() {
        MATCH_ALL.to_string()
    } else {
        input.pattern
    };
    let hint = (input.count > 0).then_some(input.count);
    let limit = hint.and_then(|count| usize::try_from(count).ok());

    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    let mut cursor = 0;
    loop {
        let (next, page) = client
            .scan(cursor, &pattern, hint)
            .await
            .map_err(|e| McpError::upstream(format!("failed to scan keys matching {:?}", pattern), e))?;
        for key in page {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        cursor = next;
        if cursor == 0 || limit.is_some_and(|limit| keys.len() >= limit) {
            break;
        }
    }
    if let Some(limit) = limit {
        keys.truncate(limit);
    }

    Ok(ScanOutput {
        count: keys.len(),
        keys,
        pattern,
    })
}

async fn keys_by_pattern(client: SharedClient, input: PatternInput) -> Result<KeysOutput> {
    validate_pattern(&input.pattern)?;
    let keys = client
        .keys(&input.pattern)
        .await
        .map_err(|e| McpError::upstream("failed to get keys by pattern", e))?;
    Ok(KeysOutput {
        count: keys.len(),
        keys,
    })
}

async fn get_key_type(client: SharedClient, input: CheckKeyInput) -> Result<TypeOutput> {
    require_non_empty(&input.key, "key")?;
    let key_type = client
        .key_type(&input.key)
        .await
        .map_err(|e| McpError::upstream(format!("failed to check key {:?}", input.key), e))?;
    Ok(TypeOutput {
        key: input.key,
        exists: key_type != NO_SUCH_KEY,
        key_type,
    })
}

async fn get_key_ttl(client: SharedClient, input: CheckKeyInput) -> Result<TtlOutput> {
    require_non_empty(&input.key, "key")?;
    let ttl = client.ttl(&input.key).await.map_err(|e| {
        McpError::upstream(format!("failed to get TTL for key {:?}", input.key), e)
    })?;
    Ok(TtlOutput {
        key: input.key,
        ttl_seconds: ttl,
        has_expiry: ttl > 0,
        exists: ttl != TTL_MISSING,
    })
}

/// Each key is deleted independently; an error part way through leaves the
/// earlier deletions in place.
async fn delete_keys(client: SharedClient, input: DeleteInput) -> Result<DeleteOutput> {
    require_items(&input.keys, "at least one key must be provided")?;
    require_keys(&input.keys)?;

    let mut deleted_count = 0;
    for key in &input.keys {
        let deleted = client
            .del(key)
            .await
            .map_err(|e| McpError::upstream(format!("failed to delete key {:?}", key), e))?;
        if deleted {
            deleted_count += 1;
        }
    }
    Ok(DeleteOutput {
        deleted_count,
        keys: input.keys,
    })
}

async fn exists_key(client: SharedClient, input: ExistsInput) -> Result<ExistsOutput> {
    require_items(&input.keys, "keys array cannot be empty")?;
    // EXISTS counts repeated keys once per mention.
    let unique: Vec<String> = input
        .keys
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let count = client
        .exists(&unique)
        .await
        .map_err(|e| McpError::upstream("failed to check key existence", e))?;
    Ok(ExistsOutput { count })
}

async fn expire_key(client: SharedClient, input: ExpireInput) -> Result<ExpireOutput> {
    require_non_empty(&input.key, "key")?;
    if input.seconds <= 0 {
        return Err(McpError::validation("seconds must be positive"));
    }
    let success = client.expire(&input.key, input.seconds).await.map_err(|e| {
        McpError::upstream(
            format!("failed to set expiration for key {:?}", input.key),
            e,
        )
    })?;
    let message = if success {
        "Expiration set successfully"
    } else {
        "Key does not exist"
    };
    Ok(ExpireOutput {
        key: input.key,
        seconds: input.seconds,
        success,
        message: message.to_string(),
    })
}

async fn persist_key(client: SharedClient, input: PersistInput) -> Result<PersistOutput> {
    require_non_empty(&input.key, "key")?;
    let success = client.persist(&input.key).await.map_err(|e| {
        McpError::upstream(format!("failed to persist key {:?}", input.key), e)
    })?;
    let message = if success {
        "Key made persistent"
    } else {
        "Key does not exist or has no expiration"
    };
    Ok(PersistOutput {
        key: input.key,
        success,
        message: message.to_string(),
    })
}

async fn rename_key(client: SharedClient, input: RenameInput) -> Result<RenameOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.new_key, "new_key")?;
    if input.key == input.new_key {
        return Err(McpError::validation("key and new_key must be different"));
    }
    client
        .rename(&input.key, &input.new_key)
        .await
        .map_err(|e| {
            McpError::upstream(
                format!(
                    "failed to rename key from {:?} to {:?}",
                    input.key, input.new_key
                ),
                e,
            )
        })?;
    Ok(RenameOutput {
        old_key: input.key,
        new_key: input.new_key,
        success: true,
        message: "Key renamed successfully".to_string(),
    })
}

async fn memory_usage(client: SharedClient, input: MemoryInput) -> Result<MemoryOutput> {
    require_non_empty(&input.key, "key")?;
    let bytes = client
        .memory_usage(&input.key)
        .await
        .map_err(|e| McpError::upstream("failed to get memory usage", e))?;
    Ok(MemoryOutput {
        bytes: bytes.unwrap_or(0),
        key: input.key,
        exists: bytes.is_some(),
    })
}

async fn touch_keys(client: SharedClient, input: TouchInput) -> Result<TouchOutput> {
    require_items(&input.keys, "keys list cannot be empty")?;
    let updated = client
        .touch(&input.keys)
        .await
        .map_err(|e| McpError::upstream("failed to touch keys", e))?;
    Ok(TouchOutput {
        count: input.keys.len(),
        keys: input.keys,
        updated,
    })
}

async fn object_encoding(client: SharedClient, input: EncodingInput) -> Result<EncodingOutput> {
    require_non_empty(&input.key, "key")?;
    let encoding = client
        .object_encoding(&input.key)
        .await
        .map_err(|e| McpError::upstream("failed to get object encoding", e))?;
    Ok(EncodingOutput {
        exists: encoding.is_some(),
        encoding: encoding.unwrap_or_default(),
        key: input.key,
    })
}

async fn object_idletime(client: SharedClient, input: IdleInput) -> Result<IdleOutput> {
    require_non_empty(&input.key, "key")?;
    let idle = client
        .object_idletime(&input.key)
        .await
        .map_err(|e| McpError::upstream("failed to get object idle time", e))?;
    Ok(IdleOutput {
        idle_time: idle.unwrap_or(0),
        exists: idle.is_some(),
    })
}

async fn dump_key(client: SharedClient, input: DumpInput) -> Result<DumpOutput> {
    require_non_empty(&input.key, "key")?;
    let payload = client
        .dump(&input.key)
        .await
        .map_err(|e| McpError::upstream("failed to dump key", e))?;
    Ok(match payload {
        Some(payload) => DumpOutput {
            serialized: STANDARD.encode(&payload),
            size: payload.len(),
            exists: true,
        },
        None => DumpOutput {
            serialized: String::new(),
            size: 0,
            exists: false,
        },
    })
}

async fn restore_key(client: SharedClient, input: RestoreInput) -> Result<RestoreOutput> {
    require_non_empty(&input.key, "key")?;
    let encoded = if input.serialized.is_empty() {
        &input.serialized_value
    } else {
        &input.serialized
    };
    if encoded.is_empty() {
        return Err(McpError::validation(
            "either 'serialized' or 'serialized_value' must be provided",
        ));
    }
    let payload = STANDARD.decode(encoded).map_err(|e| {
        McpError::validation(format!("failed to decode base64 serialized data: {}", e))
    })?;

    client
        .restore(&input.key, input.ttl, &payload)
        .await
        .map_err(|e| McpError::upstream("failed to restore key", e))?;
    Ok(RestoreOutput {
        success: true,
        message: "Key restored successfully".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockValkeyClient, ValkeyError};
    use mockall::Sequence;
    use serde_json::json;
    use std::sync::Arc;

    fn shared(mock: MockValkeyClient) -> SharedClient {
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_scan_walks_cursor_and_dedups() {
        let mut mock = MockValkeyClient::new();
        let mut seq = Sequence::new();
        mock.expect_scan()
            .withf(|cursor, pattern, count| *cursor == 0 && pattern == "*" && count.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok((17, vec!["a".into(), "b".into()])));
        mock.expect_scan()
            .withf(|cursor, _, _| *cursor == 17)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok((0, vec!["b".into(), "c".into()])));

        let out = scan_keys(shared(mock), ScanInput::default()).await.unwrap();
        assert_eq!(out.keys, vec!["a", "b", "c"]);
        assert_eq!(out.count, 3);
        assert_eq!(out.pattern, "*");
    }

    #[tokio::test]
    async fn test_scan_stops_at_count() {
        let mut mock = MockValkeyClient::new();
        mock.expect_scan()
            .times(1)
            .returning(|_, _, _| Ok((5, vec!["a".into(), "b".into(), "c".into()])));
        let out = scan_keys(
            shared(mock),
            ScanInput {
                pattern: "user:*".into(),
                count: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(out.keys, vec!["a", "b"]);
        assert_eq!(out.pattern, "user:*");
    }

    #[tokio::test]
    async fn test_keys_by_pattern_requires_pattern() {
        let err = keys_by_pattern(shared(MockValkeyClient::new()), PatternInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "pattern cannot be empty");
    }

    #[tokio::test]
    async fn test_get_key_type() {
        let mut mock = MockValkeyClient::new();
        mock.expect_key_type().returning(|key| {
            Ok(if key == "h" { "hash" } else { "none" }.to_string())
        });
        let client = shared(mock);

        let out = get_key_type(client.clone(), CheckKeyInput { key: "h".into() })
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            json!({"key": "h", "type": "hash", "exists": true})
        );
        let out = get_key_type(client, CheckKeyInput { key: "x".into() })
            .await
            .unwrap();
        assert!(!out.exists);
    }

    #[tokio::test]
    async fn test_get_key_ttl_states() {
        let mut mock = MockValkeyClient::new();
        mock.expect_ttl().returning(|key| {
            Ok(match key {
                "gone" => -2,
                "forever" => -1,
                _ => 30,
            })
        });
        let client = shared(mock);

        let gone = get_key_ttl(client.clone(), CheckKeyInput { key: "gone".into() })
            .await
            .unwrap();
        assert!(!gone.exists && !gone.has_expiry);
        let forever = get_key_ttl(client.clone(), CheckKeyInput { key: "forever".into() })
            .await
            .unwrap();
        assert!(forever.exists && !forever.has_expiry);
        let temp = get_key_ttl(client, CheckKeyInput { key: "temp".into() })
            .await
            .unwrap();
        assert!(temp.exists && temp.has_expiry);
        assert_eq!(temp.ttl_seconds, 30);
    }

    #[tokio::test]
    async fn test_delete_keys_validates_all_first() {
        let err = delete_keys(
            shared(MockValkeyClient::new()),
            DeleteInput {
                keys: vec!["a".into(), String::new()],
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "key cannot be empty");
    }

    #[tokio::test]
    async fn test_delete_keys_counts_deleted() {
        let mut mock = MockValkeyClient::new();
        mock.expect_del().returning(|key| Ok(key != "missing"));
        let out = delete_keys(
            shared(mock),
            DeleteInput {
                keys: vec!["a".into(), "missing".into(), "b".into()],
            },
        )
        .await
        .unwrap();
        assert_eq!(out.deleted_count, 2);
        assert_eq!(out.keys.len(), 3);
    }

    #[tokio::test]
    async fn test_exists_dedups_keys() {
        let mut mock = MockValkeyClient::new();
        mock.expect_exists()
            .withf(|keys| *keys == ["a", "b"])
            .returning(|_| Ok(1));
        let out = exists_key(
            shared(mock),
            ExistsInput {
                keys: vec!["b".into(), "a".into(), "b".into()],
            },
        )
        .await
        .unwrap();
        assert_eq!(out.count, 1);
    }

    #[tokio::test]
    async fn test_expire_rejects_non_positive() {
        let err = expire_key(
            shared(MockValkeyClient::new()),
            ExpireInput {
                key: "k".into(),
                seconds: 0,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "seconds must be positive");
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let mut mock = MockValkeyClient::new();
        mock.expect_expire().returning(|_, _| Ok(false));
        let out = expire_key(
            shared(mock),
            ExpireInput {
                key: "k".into(),
                seconds: 10,
            },
        )
        .await
        .unwrap();
        assert!(!out.success);
        assert_eq!(out.message, "Key does not exist");
    }

    #[tokio::test]
    async fn test_rename_rules() {
        let client = shared(MockValkeyClient::new());
        let err = rename_key(
            client.clone(),
            RenameInput {
                key: "a".into(),
                new_key: "a".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "key and new_key must be different");

        let err = rename_key(
            client,
            RenameInput {
                key: "a".into(),
                new_key: String::new(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "new_key cannot be empty");
    }

    #[tokio::test]
    async fn test_dump_and_restore() {
        let mut mock = MockValkeyClient::new();
        mock.expect_dump()
            .returning(|_| Ok(Some(vec![0x00, 0x01, 0xff])));
        mock.expect_restore()
            .withf(|key, ttl, payload| key == "copy" && *ttl == 0 && *payload == [0x00u8, 0x01, 0xff])
            .returning(|_, _, _| Ok(()));
        let client = shared(mock);

        let dumped = dump_key(client.clone(), DumpInput { key: "src".into() })
            .await
            .unwrap();
        assert_eq!(dumped.serialized, "AAH/");
        assert_eq!(dumped.size, 3);

        let restored = restore_key(
            client,
            RestoreInput {
                key: "copy".into(),
                serialized_value: dumped.serialized,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(restored.success);
        assert_eq!(restored.message, "Key restored successfully");
    }

    #[tokio::test]
    async fn test_dump_missing_key() {
        let mut mock = MockValkeyClient::new();
        mock.expect_dump().returning(|_| Ok(None));
        let out = dump_key(shared(mock), DumpInput { key: "nope".into() })
            .await
            .unwrap();
        assert!(!out.exists);
        assert_eq!(out.serialized, "");
    }

    #[tokio::test]
    async fn test_restore_input_errors() {
        let client = shared(MockValkeyClient::new());
        let err = restore_key(
            client.clone(),
            RestoreInput {
                key: "k".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "either 'serialized' or 'serialized_value' must be provided"
        );

        let err = restore_key(
            client,
            RestoreInput {
                key: "k".into(),
                serialized: "not base64!".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("failed to decode base64 serialized data: "));
    }

    #[tokio::test]
    async fn test_touch_reports_requested_and_updated() {
        let mut mock = MockValkeyClient::new();
        mock.expect_touch().returning(|_| Ok(1));
        let out = touch_keys(
            shared(mock),
            TouchInput {
                keys: vec!["a".into(), "b".into()],
            },
        )
        .await
        .unwrap();
        assert_eq!(out.count, 2);
        assert_eq!(out.updated, 1);
    }

    #[tokio::test]
    async fn test_object_introspection_missing_key() {
        let mut mock = MockValkeyClient::new();
        mock.expect_object_encoding().returning(|_| Ok(None));
        mock.expect_object_idletime().returning(|_| Ok(Some(42)));
        mock.expect_memory_usage().returning(|_| Ok(None));
        let client = shared(mock);

        let enc = object_encoding(client.clone(), EncodingInput { key: "k".into() })
            .await
            .unwrap();
        assert!(!enc.exists);
        assert_eq!(enc.encoding, "");
        let idle = object_idletime(client.clone(), IdleInput { key: "k".into() })
            .await
            .unwrap();
        assert_eq!(idle.idle_time, 42);
        let mem = memory_usage(client, MemoryInput { key: "k".into() })
            .await
            .unwrap();
        assert!(!mem.exists);
    }

    #[tokio::test]
    async fn test_upstream_error_is_wrapped() {
        let mut mock = MockValkeyClient::new();
        mock.expect_persist().returning(|_| {
            Err(ValkeyError::Connection("connection refused".into()))
        });
        let err = persist_key(shared(mock), PersistInput { key: "k".into() })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to persist key \"k\": failed to connect to valkey: connection refused"
        );
    }
}
