//! Reply parsing for commands whose shape differs between RESP2 and RESP3
//! or that return structured text.

use std::collections::BTreeMap;

use redis::Value;

use super::{Result, SlowlogEntry, StreamEntry, ValkeyError};

fn unexpected(command: &'static str, reason: impl Into<String>) -> ValkeyError {
    ValkeyError::UnexpectedReply {
        command,
        reason: reason.into(),
    }
}

/// Raw bytes of a scalar reply.
pub fn value_bytes(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::BulkString(bytes) => Some(bytes),
        Value::SimpleString(s) => Some(s.into_bytes()),
        Value::VerbatimString { text, .. } => Some(text.into_bytes()),
        Value::Okay => Some(b"OK".to_vec()),
        Value::Int(n) => Some(n.to_string().into_bytes()),
        Value::Double(d) => Some(d.to_string().into_bytes()),
        _ => None,
    }
}

/// Scalar reply as text; invalid UTF-8 is replaced.
pub fn value_string(value: Value) -> Option<String> {
    value_bytes(value).map(|b| String::from_utf8_lossy(&b).into_owned())
}

fn value_int(value: Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(n),
        other => value_string(other).and_then(|s| s.parse().ok()),
    }
}

/// Collect alternating name/value items into a map.
fn flat_pairs(items: Vec<Value>) -> Vec<(Value, Value)> {
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        pairs.push((k, v));
    }
    pairs
}

/// Pairs of a RESP3 map or a RESP2 flat array.
fn into_pairs(command: &'static str, value: Value) -> Result<Vec<(Value, Value)>> {
    match value {
        Value::Map(pairs) => Ok(pairs),
        Value::Array(items) => Ok(flat_pairs(items)),
        Value::Nil => Ok(Vec::new()),
        other => Err(unexpected(command, format!("expected map, got {:?}", other))),
    }
}

/// Parse one `[id, fields]` stream entry.
pub fn parse_stream_entry(command: &'static str, value: Value) -> Result<StreamEntry> {
    let mut parts = match value {
        Value::Array(parts) if parts.len() == 2 => parts.into_iter(),
        other => {
            return Err(unexpected(
                command,
                format!("expected [id, fields], got {:?}", other),
            ))
        }
    };

    let id = parts
        .next()
        .and_then(value_string)
        .ok_or_else(|| unexpected(command, "stream entry id is not a string"))?;

    let mut fields = BTreeMap::new();
    if let Some(raw) = parts.next() {
        for (name, val) in into_pairs(command, raw)? {
            let name = value_string(name)
                .ok_or_else(|| unexpected(command, "stream field name is not a string"))?;
            fields.insert(name, value_bytes(val).unwrap_or_default());
        }
    }

    Ok(StreamEntry { id, fields })
}

/// Parse an XRANGE-style list of entries.
pub fn parse_stream_entries(command: &'static str, value: Value) -> Result<Vec<StreamEntry>> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| parse_stream_entry(command, item))
            .collect(),
        other => Err(unexpected(
            command,
            format!("expected entry list, got {:?}", other),
        )),
    }
}

/// Parse an XREAD reply and return the entries for `key`.
///
/// RESP3 servers answer with `{key: entries}`, RESP2 servers with
/// `[[key, entries], ...]`; a nil reply means nothing new.
pub fn parse_xread(command: &'static str, key: &str, value: Value) -> Result<Vec<StreamEntry>> {
    let streams: Vec<(Value, Value)> = match value {
        Value::Nil => return Ok(Vec::new()),
        Value::Map(pairs) => pairs,
        Value::Array(items) => {
            let mut pairs = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Array(inner) if inner.len() == 2 => {
                        let mut inner = inner.into_iter();
                        if let (Some(name), Some(entries)) = (inner.next(), inner.next()) {
                            pairs.push((name, entries));
                        }
                    }
                    other => {
                        return Err(unexpected(
                            command,
                            format!("expected [key, entries], got {:?}", other),
                        ))
                    }
                }
            }
            pairs
        }
        other => {
            return Err(unexpected(
                command,
                format!("expected stream list, got {:?}", other),
            ))
        }
    };

    for (name, entries) in streams {
        if value_string(name).as_deref() == Some(key) {
            return parse_stream_entries(command, entries);
        }
    }
    Ok(Vec::new())
}

/// Parse a CONFIG GET reply into parameter/value pairs.
pub fn parse_config(command: &'static str, value: Value) -> Result<BTreeMap<String, String>> {
    let mut config = BTreeMap::new();
    for (name, val) in into_pairs(command, value)? {
        let name = value_string(name)
            .ok_or_else(|| unexpected(command, "parameter name is not a string"))?;
        config.insert(name, value_string(val).unwrap_or_default());
    }
    Ok(config)
}

/// Parse an HGETALL reply. Field names that are not valid UTF-8 are decoded
/// lossily; values keep their raw bytes.
pub fn parse_hash(command: &'static str, value: Value) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut hash = BTreeMap::new();
    for (name, val) in into_pairs(command, value)? {
        let name = value_string(name)
            .ok_or_else(|| unexpected(command, "hash field name is not a string"))?;
        hash.insert(name, value_bytes(val).unwrap_or_default());
    }
    Ok(hash)
}

/// Parse SLOWLOG GET entries.
///
/// Each entry is `[id, timestamp, duration, [args...], addr?, name?]`; the
/// last two fields only exist on servers from 4.0 on.
pub fn parse_slowlog(command: &'static str, value: Value) -> Result<Vec<SlowlogEntry>> {
    let items = match value {
        Value::Nil => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(unexpected(
                command,
                format!("expected entry list, got {:?}", other),
            ))
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let parts = match item {
            Value::Array(parts) if parts.len() >= 4 => parts,
            other => {
                return Err(unexpected(
                    command,
                    format!("malformed slowlog entry: {:?}", other),
                ))
            }
        };
        let mut parts = parts.into_iter();
        let mut next_int = |field: &str| {
            parts
                .next()
                .and_then(value_int)
                .ok_or_else(|| unexpected(command, format!("slowlog {} is not an integer", field)))
        };
        let id = next_int("id")?;
        let timestamp = next_int("timestamp")?;
        let duration_micros = next_int("duration")?;

        let args = match parts.next() {
            Some(Value::Array(args)) => args.into_iter().filter_map(value_string).collect(),
            _ => Vec::new(),
        };
        let client_addr = parts.next().and_then(value_string);
        let client_name = parts
            .next()
            .and_then(value_string)
            .filter(|name| !name.is_empty());

        entries.push(SlowlogEntry {
            id,
            timestamp,
            duration_micros,
            args,
            client_addr,
            client_name,
        });
    }
    Ok(entries)
}

/// Parse `key:value` lines as produced by INFO and CLUSTER INFO.
///
/// Section headers (`# Server`) and blank lines are skipped.
pub fn parse_info(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Number of connections listed in a CLIENT LIST reply.
pub fn count_clients(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    fn entry(id: &str, fields: &[(&str, &str)]) -> Value {
        let flat = fields
            .iter()
            .flat_map(|(k, v)| vec![bulk(k), bulk(v)])
            .collect();
        Value::Array(vec![bulk(id), Value::Array(flat)])
    }

    #[test]
    fn test_hash_with_binary_field_name() {
        let flat = Value::Array(vec![
            bulk("name"),
            bulk("alice"),
            Value::BulkString(vec![b'k', 0xff]),
            Value::BulkString(vec![0x00, 0x01]),
        ]);
        let hash = parse_hash("HGETALL", flat).unwrap();
        assert_eq!(hash.len(), 2);
        assert_eq!(hash.get("name"), Some(&b"alice".to_vec()));
        assert_eq!(hash.get("k\u{fffd}"), Some(&vec![0x00, 0x01]));

        let resp3 = Value::Map(vec![(bulk("a"), bulk("1"))]);
        assert_eq!(parse_hash("HGETALL", resp3).unwrap().len(), 1);
        assert!(parse_hash("HGETALL", Value::Nil).unwrap().is_empty());
        assert!(parse_hash("HGETALL", Value::Int(3)).is_err());
    }

    #[test]
    fn test_stream_entry_flat_fields() {
        let parsed = parse_stream_entry("XRANGE", entry("1-0", &[("a", "1"), ("b", "2")])).unwrap();
        assert_eq!(parsed.id, "1-0");
        assert_eq!(parsed.fields.get("a"), Some(&b"1".to_vec()));
        assert_eq!(parsed.fields.get("b"), Some(&b"2".to_vec()));
    }

    #[test]
    fn test_stream_entry_map_fields() {
        let value = Value::Array(vec![
            bulk("2-0"),
            Value::Map(vec![(bulk("raw"), Value::BulkString(vec![0xff]))]),
        ]);
        let parsed = parse_stream_entry("XRANGE", value).unwrap();
        assert_eq!(parsed.fields.get("raw"), Some(&vec![0xff]));
    }

    #[test]
    fn test_stream_entry_rejects_garbage() {
        assert!(parse_stream_entry("XRANGE", Value::Int(1)).is_err());
    }

    #[test]
    fn test_xread_resp2_and_resp3() {
        let entries = Value::Array(vec![entry("1-0", &[("k", "v")])]);

        let resp2 = Value::Array(vec![Value::Array(vec![bulk("events"), entries.clone()])]);
        let parsed = parse_xread("XREAD", "events", resp2).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "1-0");

        let resp3 = Value::Map(vec![(bulk("events"), entries)]);
        let parsed = parse_xread("XREAD", "events", resp3).unwrap();
        assert_eq!(parsed.len(), 1);

        assert!(parse_xread("XREAD", "events", Value::Nil).unwrap().is_empty());
    }

    #[test]
    fn test_config_flat_and_map() {
        let flat = Value::Array(vec![bulk("maxmemory"), bulk("0")]);
        let parsed = parse_config("CONFIG GET", flat).unwrap();
        assert_eq!(parsed.get("maxmemory").map(String::as_str), Some("0"));

        let map = Value::Map(vec![(bulk("timeout"), bulk("300"))]);
        let parsed = parse_config("CONFIG GET", map).unwrap();
        assert_eq!(parsed.get("timeout").map(String::as_str), Some("300"));
    }

    #[test]
    fn test_slowlog_entries() {
        let value = Value::Array(vec![
            Value::Array(vec![
                Value::Int(14),
                Value::Int(1_700_000_000),
                Value::Int(15_000),
                Value::Array(vec![bulk("KEYS"), bulk("*")]),
                bulk("127.0.0.1:50000"),
                bulk(""),
            ]),
            Value::Array(vec![
                Value::Int(13),
                Value::Int(1_699_999_999),
                Value::Int(12_000),
                Value::Array(vec![bulk("SORT"), bulk("big")]),
            ]),
        ]);
        let parsed = parse_slowlog("SLOWLOG GET", value).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id, 14);
        assert_eq!(parsed[0].args, vec!["KEYS", "*"]);
        assert_eq!(parsed[0].client_addr.as_deref(), Some("127.0.0.1:50000"));
        assert_eq!(parsed[0].client_name, None);
        assert_eq!(parsed[1].duration_micros, 12_000);
        assert_eq!(parsed[1].client_addr, None);
    }

    #[test]
    fn test_parse_info_skips_headers() {
        let text = "# Server\r\nredis_version:7.2.4\r\n\r\n# Clients\r\nconnected_clients:3\r\n";
        let info = parse_info(text);
        assert_eq!(info.len(), 2);
        assert_eq!(info["redis_version"], "7.2.4");
        assert_eq!(info["connected_clients"], "3");
    }

    #[test]
    fn test_count_clients() {
        let text = "id=3 addr=127.0.0.1:1 name=\nid=4 addr=127.0.0.1:2 name=\n";
        assert_eq!(count_clients(text), 2);
        assert_eq!(count_clients(""), 0);
    }
}
