//! String tools.
//!
//! Tools: get_string, set_string, mget_strings, incr_string, decr_string,
//!        append_string, string_length, get_string_range

use std::collections::BTreeMap;

use serde::Serialize;

use crate::client::{SetCondition, SharedClient};
use crate::encoding::{safe_optional, safe_value, SafeValue};
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, or_one, require_items, require_keys, require_non_empty};

tool_input! {
    struct KeyInput {
        #[field("key", "required,description=Key to retrieve")]
        key: String,
    }
}

tool_input! {
    struct SetStringInput {
        #[field("key", "required,description=Key to set")]
        key: String,
        #[field("value", "required,description=Value to store")]
        value: String,
        #[field("ttl_seconds", "description=Optional TTL in seconds")]
        ttl_seconds: Option<i64>,
        #[field("nx", "description=Only set if key does not exist")]
        nx: bool,
        #[field("xx", "description=Only set if key exists")]
        xx: bool,
    }
}

tool_input! {
    struct MgetInput {
        #[field("keys", "required,minItems=1,description=Keys to retrieve")]
        keys: Vec<String>,
    }
}

tool_input! {
    struct IncrInput {
        #[field("key", "required,description=Key storing a numeric string")]
        key: String,
        #[field("amount", "description=Amount to increment (default: 1)")]
        amount: i64,
    }
}

tool_input! {
    struct DecrInput {
        #[field("key", "required,description=Key storing a numeric string")]
        key: String,
        #[field("amount", "description=Amount to decrement (default: 1)")]
        amount: i64,
    }
}

tool_input! {
    struct LengthInput {
        #[field("key", "required,description=String key")]
        key: String,
    }
}

tool_input! {
    struct AppendInput {
        #[field("key", "required,description=Key to append to")]
        key: String,
        #[field("value", "required,description=Value to append")]
        value: String,
    }
}

tool_input! {
    struct RangeInput {
        #[field("key", "required")]
        key: String,
        #[field("start", "required")]
        start: i64,
        #[field("end", "required")]
        end: i64,
    }
}

#[derive(Debug, Serialize)]
struct GetStringOutput {
    key: String,
    value: SafeValue,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct SetStringOutput {
    success: bool,
    key: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct MgetOutput {
    values: BTreeMap<String, SafeValue>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct CounterOutput {
    key: String,
    value: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct AppendOutput {
    key: String,
    new_length: i64,
    appended_value: String,
}

#[derive(Debug, Serialize)]
struct LengthOutput {
    key: String,
    length: usize,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct RangeOutput {
    key: String,
    value: SafeValue,
}

/// Register the string tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "get_string",
        "Get a string value from Valkey by key",
        client,
        get_string,
    ));
    registry.must_register(command_tool(
        "set_string",
        "Set a string value in Valkey with optional TTL and conditional flags (NX/XX)",
        client,
        set_string,
    ));
    registry.must_register(command_tool(
        "mget_strings",
        "Get multiple string values from Valkey by keys",
        client,
        mget_strings,
    ));
    registry.must_register(command_tool(
        "incr_string",
        "Increment a numeric string value",
        client,
        incr_string,
    ));
    registry.must_register(command_tool(
        "decr_string",
        "Decrement a numeric string value",
        client,
        decr_string,
    ));
    registry.must_register(command_tool(
        "append_string",
        "Append a value to a string",
        client,
        append_string,
    ));
    registry.must_register(command_tool(
        "string_length",
        "Get the length of a string value",
        client,
        string_length,
    ));
    registry.must_register(command_tool(
        "get_string_range",
        "Get a substring of a string by start and end index",
        client,
        get_string_range,
    ));
}

async fn get_string(client: SharedClient, input: KeyInput) -> Result<GetStringOutput> {
    require_non_empty(&input.key, "key")?;
    let value = client.get(&input.key).await.map_err(|e| {
        McpError::upstream(format!("failed to get string for key {:?}", input.key), e)
    })?;
    Ok(GetStringOutput {
        exists: value.is_some(),
        value: safe_optional(value),
        key: input.key,
    })
}

async fn set_string(client: SharedClient, input: SetStringInput) -> Result<SetStringOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.value, "value")?;
    let condition = match (input.nx, input.xx) {
        (true, true) => {
            return Err(McpError::validation(
                "cannot specify both NX and XX flags",
            ))
        }
        (true, false) => SetCondition::IfAbsent,
        (false, true) => SetCondition::IfExists,
        (false, false) => SetCondition::Always,
    };
    let ttl = input.ttl_seconds.filter(|ttl| *ttl > 0);

    let success = client
        .set(&input.key, &input.value, ttl, condition)
        .await
        .map_err(|e| {
            McpError::upstream(format!("failed to set string for key {:?}", input.key), e)
        })?;

    let message = if success {
        "Key set successfully"
    } else {
        "Key condition not met (NX or XX flag)"
    };
    Ok(SetStringOutput {
        success,
        key: input.key,
        message: message.to_string(),
    })
}

async fn mget_strings(client: SharedClient, input: MgetInput) -> Result<MgetOutput> {
    require_items(&input.keys, "at least one key must be provided")?;
    require_keys(&input.keys)?;

    let mut values = BTreeMap::new();
    for key in input.keys {
        let raw = client.get(&key).await.map_err(|e| {
            McpError::upstream(format!("failed to get string for key {:?}", key), e)
        })?;
        if let Some(raw) = raw {
            values.insert(key, safe_value(raw));
        }
    }
    Ok(MgetOutput {
        count: values.len(),
        values,
    })
}

async fn incr_string(client: SharedClient, input: IncrInput) -> Result<CounterOutput> {
    require_non_empty(&input.key, "key")?;
    let amount = or_one(input.amount);
    let value = client.incr_by(&input.key, amount).await.map_err(|e| {
        McpError::upstream(format!("failed to increment key {:?}", input.key), e)
    })?;
    Ok(CounterOutput {
        key: input.key,
        value,
        message: format!("Incremented by {}", amount),
    })
}

async fn decr_string(client: SharedClient, input: DecrInput) -> Result<CounterOutput> {
    require_non_empty(&input.key, "key")?;
    let amount = or_one(input.amount);
    let value = client.decr_by(&input.key, amount).await.map_err(|e| {
        McpError::upstream(format!("failed to decrement key {:?}", input.key), e)
    })?;
    Ok(CounterOutput {
        key: input.key,
        value,
        message: format!("Decremented by {}", amount),
    })
}

async fn append_string(client: SharedClient, input: AppendInput) -> Result<AppendOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.value, "value")?;
    let new_length = client.append(&input.key, &input.value).await.map_err(|e| {
        McpError::upstream(format!("failed to append to key {:?}", input.key), e)
    })?;
    Ok(AppendOutput {
        key: input.key,
        new_length,
        appended_value: input.value,
    })
}

async fn string_length(client: SharedClient, input: LengthInput) -> Result<LengthOutput> {
    require_non_empty(&input.key, "key")?;
    let value = client.get(&input.key).await.map_err(|e| {
        McpError::upstream(format!("failed to get string for key {:?}", input.key), e)
    })?;
    Ok(LengthOutput {
        key: input.key,
        length: value.as_ref().map_or(0, Vec::len),
        exists: value.is_some(),
    })
}

async fn get_string_range(client: SharedClient, input: RangeInput) -> Result<RangeOutput> {
    require_non_empty(&input.key, "key")?;
    let value = client
        .get_range(&input.key, input.start, input.end)
        .await
        .map_err(|e| McpError::upstream("failed to get string range", e))?;
    Ok(RangeOutput {
        key: input.key,
        value: safe_value(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockValkeyClient;
    use serde_json::json;
    use std::sync::Arc;

    fn shared(mock: MockValkeyClient) -> SharedClient {
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_get_string_text_and_missing() {
        let mut mock = MockValkeyClient::new();
        mock.expect_get()
            .withf(|key| key == "greeting")
            .returning(|_| Ok(Some(b"hello".to_vec())));
        mock.expect_get()
            .withf(|key| key == "absent")
            .returning(|_| Ok(None));
        let client = shared(mock);

        let out = get_string(client.clone(), KeyInput { key: "greeting".into() })
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            json!({"key": "greeting", "value": "hello", "exists": true})
        );

        let out = get_string(client, KeyInput { key: "absent".into() })
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            json!({"key": "absent", "value": "", "exists": false})
        );
    }

    #[tokio::test]
    async fn test_get_string_empty_value_exists() {
        let mut mock = MockValkeyClient::new();
        mock.expect_get()
            .withf(|key| key == "e")
            .returning(|_| Ok(Some(Vec::new())));
        let out = get_string(shared(mock), KeyInput { key: "e".into() })
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            json!({"key": "e", "value": "", "exists": true})
        );
    }

    #[tokio::test]
    async fn test_get_string_binary_is_base64() {
        let mut mock = MockValkeyClient::new();
        mock.expect_get()
            .returning(|_| Ok(Some(vec![0xff, 0x00])));
        let out = get_string(shared(mock), KeyInput { key: "blob".into() })
            .await
            .unwrap();
        assert_eq!(serde_json::to_value(out).unwrap()["value"], "/wA=");
    }

    #[tokio::test]
    async fn test_set_string_validation_before_call() {
        // No expectations: any client call would panic.
        let client = shared(MockValkeyClient::new());

        let err = set_string(
            client.clone(),
            SetStringInput {
                key: "k".into(),
                value: "v".into(),
                nx: true,
                xx: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "cannot specify both NX and XX flags");

        let err = set_string(client.clone(), SetStringInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "key cannot be empty");

        let err = set_string(
            client,
            SetStringInput {
                key: "k".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "value cannot be empty");
    }

    #[tokio::test]
    async fn test_set_string_flags_and_ttl() {
        let mut mock = MockValkeyClient::new();
        mock.expect_set()
            .withf(|key, value, ttl, condition| {
                key == "session"
                    && value == "abc"
                    && *ttl == Some(60)
                    && *condition == SetCondition::IfAbsent
            })
            .returning(|_, _, _, _| Ok(false));
        let out = set_string(
            shared(mock),
            SetStringInput {
                key: "session".into(),
                value: "abc".into(),
                ttl_seconds: Some(60),
                nx: true,
                xx: false,
            },
        )
        .await
        .unwrap();
        assert!(!out.success);
        assert_eq!(out.message, "Key condition not met (NX or XX flag)");
    }

    #[tokio::test]
    async fn test_mget_skips_missing_keys() {
        let mut mock = MockValkeyClient::new();
        mock.expect_get().returning(|key| {
            Ok(match key {
                "a" => Some(b"1".to_vec()),
                _ => None,
            })
        });
        let out = mget_strings(
            shared(mock),
            MgetInput {
                keys: vec!["a".into(), "b".into()],
            },
        )
        .await
        .unwrap();
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            json!({"values": {"a": "1"}, "count": 1})
        );
    }

    #[tokio::test]
    async fn test_mget_rejects_empty_key_up_front() {
        let err = mget_strings(
            shared(MockValkeyClient::new()),
            MgetInput {
                keys: vec!["a".into(), String::new()],
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "key cannot be empty");
    }

    #[tokio::test]
    async fn test_incr_defaults_to_one() {
        let mut mock = MockValkeyClient::new();
        mock.expect_incr_by()
            .withf(|key, amount| key == "hits" && *amount == 1)
            .returning(|_, _| Ok(11));
        let out = incr_string(
            shared(mock),
            IncrInput {
                key: "hits".into(),
                amount: 0,
            },
        )
        .await
        .unwrap();
        assert_eq!(out.value, 11);
        assert_eq!(out.message, "Incremented by 1");
    }

    #[tokio::test]
    async fn test_decr_with_amount() {
        let mut mock = MockValkeyClient::new();
        mock.expect_decr_by()
            .withf(|_, amount| *amount == 5)
            .returning(|_, _| Ok(-5));
        let out = decr_string(
            shared(mock),
            DecrInput {
                key: "stock".into(),
                amount: 5,
            },
        )
        .await
        .unwrap();
        assert_eq!(out.value, -5);
        assert_eq!(out.message, "Decremented by 5");
    }

    #[tokio::test]
    async fn test_string_length_counts_bytes() {
        let mut mock = MockValkeyClient::new();
        mock.expect_get()
            .returning(|_| Ok(Some("héllo".as_bytes().to_vec())));
        let out = string_length(shared(mock), LengthInput { key: "k".into() })
            .await
            .unwrap();
        assert_eq!(out.length, 6);
        assert!(out.exists);
    }

    #[tokio::test]
    async fn test_upstream_error_names_key() {
        let mut mock = MockValkeyClient::new();
        mock.expect_append().returning(|_, _| {
            Err(crate::client::ValkeyError::UnexpectedReply {
                command: "APPEND",
                reason: "boom".into(),
            })
        });
        let err = append_string(
            shared(mock),
            AppendInput {
                key: "log".into(),
                value: "x".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to append to key \"log\": unexpected APPEND reply: boom"
        );
    }
}
