//! Binary-safe value encoding.
//!
//! Database values are arbitrary bytes but tool results are JSON. Valid UTF-8
//! is emitted as a plain string; anything else is emitted as standard base64
//! so no byte is ever lost or replaced.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::client::StreamEntry;

/// Field name carrying the entry id in encoded stream entries.
pub const STREAM_ID_FIELD: &str = "_id";

/// A JSON-safe rendering of a byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeValue {
    /// Bytes that were valid UTF-8.
    Text(String),
    /// Bytes that were not; serialized as base64.
    Binary(Vec<u8>),
}

impl SafeValue {
    /// Recover the original bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            SafeValue::Text(s) => s.into_bytes(),
            SafeValue::Binary(b) => b,
        }
    }

    /// Whether this value will be emitted as base64.
    pub fn is_binary(&self) -> bool {
        matches!(self, SafeValue::Binary(_))
    }
}

impl Default for SafeValue {
    fn default() -> Self {
        SafeValue::Text(String::new())
    }
}

impl Serialize for SafeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SafeValue::Text(s) => serializer.serialize_str(s),
            SafeValue::Binary(b) => serializer.serialize_str(&STANDARD.encode(b)),
        }
    }
}

impl From<SafeValue> for JsonValue {
    fn from(value: SafeValue) -> Self {
        match value {
            SafeValue::Text(s) => JsonValue::String(s),
            SafeValue::Binary(b) => JsonValue::String(STANDARD.encode(b)),
        }
    }
}

/// Encode one byte string.
pub fn safe_value(bytes: Vec<u8>) -> SafeValue {
    match String::from_utf8(bytes) {
        Ok(text) => SafeValue::Text(text),
        Err(e) => SafeValue::Binary(e.into_bytes()),
    }
}

/// Encode a possibly absent byte string; absence encodes as `""`.
pub fn safe_optional(bytes: Option<Vec<u8>>) -> SafeValue {
    bytes.map(safe_value).unwrap_or_default()
}

/// Encode a sequence, preserving order and length.
pub fn safe_slice(values: Vec<Vec<u8>>) -> Vec<SafeValue> {
    values.into_iter().map(safe_value).collect()
}

/// Encode the values of a map; keys pass through unchanged.
pub fn safe_map(values: BTreeMap<String, Vec<u8>>) -> BTreeMap<String, SafeValue> {
    values
        .into_iter()
        .map(|(k, v)| (k, safe_value(v)))
        .collect()
}

/// Encode stream entries as maps with the id under `_id`.
pub fn safe_stream_entries(entries: Vec<StreamEntry>) -> Vec<BTreeMap<String, SafeValue>> {
    entries
        .into_iter()
        .map(|entry| {
            let mut encoded = safe_map(entry.fields);
            encoded.insert(STREAM_ID_FIELD.to_string(), SafeValue::Text(entry.id));
            encoded
        })
        .collect()
}

/// Convert a raw server reply (as returned by scripts) into JSON.
pub fn reply_to_json(value: redis::Value) -> JsonValue {
    use redis::Value;

    match value {
        Value::Nil => JsonValue::Null,
        Value::Int(n) => JsonValue::from(n),
        Value::BulkString(bytes) => safe_value(bytes).into(),
        Value::SimpleString(s) => JsonValue::String(s),
        Value::Okay => JsonValue::String("OK".to_string()),
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::Double(d) => serde_json::Number::from_f64(d)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Array(items) | Value::Set(items) => {
            JsonValue::Array(items.into_iter().map(reply_to_json).collect())
        }
        Value::Map(pairs) => {
            let mut object = Map::new();
            for (k, v) in pairs {
                let key = match reply_to_json(k) {
                    JsonValue::String(s) => s,
                    other => other.to_string(),
                };
                object.insert(key, reply_to_json(v));
            }
            JsonValue::Object(object)
        }
        Value::VerbatimString { text, .. } => JsonValue::String(text),
        other => JsonValue::String(format!("{:?}", other)),
    }
}
