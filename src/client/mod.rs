//! Database client abstraction.
//!
//! Tools depend on [`ValkeyClient`], never on a concrete connection, so the
//! whole tool layer can be exercised against a mock.

mod redis_client;
pub mod reply;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

pub use redis_client::RedisClient;

/// Client-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ValkeyError {
    /// The server rejected the command or the connection failed mid-command.
    #[error("{command} failed: {source}")]
    Command {
        /// Command name
        command: &'static str,
        /// Driver error
        #[source]
        source: redis::RedisError,
    },

    /// The reply did not have the expected shape.
    #[error("unexpected {command} reply: {reason}")]
    UnexpectedReply {
        /// Command name
        command: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Could not establish the initial connection.
    #[error("failed to connect to valkey: {0}")]
    Connection(String),
}

/// Result type for client calls.
pub type Result<T> = std::result::Result<T, ValkeyError>;

/// Shared handle used by every tool.
pub type SharedClient = Arc<dyn ValkeyClient>;

/// Write condition for SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetCondition {
    /// Unconditional write.
    #[default]
    Always,
    /// Only when the key does not exist (NX).
    IfAbsent,
    /// Only when the key already exists (XX).
    IfExists,
}

/// Which end of a list to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEnd {
    /// Left end.
    Head,
    /// Right end.
    Tail,
}

/// One stream entry with raw field values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEntry {
    /// Entry id (`<ms>-<seq>`).
    pub id: String,
    /// Field name to value bytes.
    pub fields: BTreeMap<String, Vec<u8>>,
}

/// One SLOWLOG GET entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlowlogEntry {
    /// Unique entry id.
    pub id: i64,
    /// Unix time the command was logged.
    pub timestamp: i64,
    /// Execution time in microseconds.
    pub duration_micros: i64,
    /// Command and arguments.
    pub args: Vec<String>,
    /// Client address, when the server reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,
    /// Client name, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

/// Operations the tool layer needs from the database.
///
/// Payload values are returned as raw bytes; identifiers and metadata as
/// strings. Lookups of a single element return `None` when it is absent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValkeyClient: Send + Sync {
    // Server

    /// PING.
    async fn ping(&self) -> Result<()>;
    /// INFO, raw text.
    async fn info(&self) -> Result<String>;
    /// CLIENT LIST, raw text.
    async fn client_list(&self) -> Result<String>;
    /// DBSIZE.
    async fn dbsize(&self) -> Result<i64>;
    /// SLOWLOG GET; `None` uses the server default count.
    async fn slowlog_get(&self, count: Option<i64>) -> Result<Vec<SlowlogEntry>>;

    // Strings

    /// GET.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// SET with optional EX and NX/XX; false when the condition was not met.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<i64>,
        condition: SetCondition,
    ) -> Result<bool>;
    /// INCRBY.
    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64>;
    /// DECRBY.
    async fn decr_by(&self, key: &str, amount: i64) -> Result<i64>;
    /// APPEND; returns the new length.
    async fn append(&self, key: &str, value: &str) -> Result<i64>;
    /// GETRANGE.
    async fn get_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<u8>>;

    // Keys

    /// DEL of one key; true when it existed.
    async fn del(&self, key: &str) -> Result<bool>;
    /// EXISTS; number of keys that exist.
    async fn exists(&self, keys: &[String]) -> Result<i64>;
    /// EXPIRE; false when the key does not exist.
    async fn expire(&self, key: &str, seconds: i64) -> Result<bool>;
    /// PERSIST; false when there was nothing to remove.
    async fn persist(&self, key: &str) -> Result<bool>;
    /// RENAME.
    async fn rename(&self, key: &str, new_key: &str) -> Result<()>;
    /// TTL (-1 no expiry, -2 missing).
    async fn ttl(&self, key: &str) -> Result<i64>;
    /// TYPE.
    async fn key_type(&self, key: &str) -> Result<String>;
    /// One SCAN step; returns the next cursor and the keys of this page.
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: Option<i64>,
    ) -> Result<(u64, Vec<String>)>;
    /// KEYS.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
    /// TOUCH; number of keys touched.
    async fn touch(&self, keys: &[String]) -> Result<i64>;
    /// MEMORY USAGE.
    async fn memory_usage(&self, key: &str) -> Result<Option<i64>>;
    /// OBJECT ENCODING.
    async fn object_encoding(&self, key: &str) -> Result<Option<String>>;
    /// OBJECT IDLETIME.
    async fn object_idletime(&self, key: &str) -> Result<Option<i64>>;
    /// DUMP.
    async fn dump(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// RESTORE with a TTL in milliseconds (0 for none).
    async fn restore(&self, key: &str, ttl_millis: i64, payload: &[u8]) -> Result<()>;

    // Hashes

    /// HGETALL.
    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>>;
    /// HSET; number of fields added.
    async fn hset(&self, key: &str, fields: &BTreeMap<String, String>) -> Result<i64>;
    /// HGET.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;
    /// HMGET, one slot per requested field.
    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<Vec<u8>>>>;
    /// HDEL; number of fields removed.
    async fn hdel(&self, key: &str, fields: &[String]) -> Result<i64>;
    /// HEXISTS.
    async fn hexists(&self, key: &str, field: &str) -> Result<bool>;
    /// HINCRBY.
    async fn hincr_by(&self, key: &str, field: &str, amount: i64) -> Result<i64>;
    /// HLEN.
    async fn hlen(&self, key: &str) -> Result<i64>;
    /// HKEYS.
    async fn hkeys(&self, key: &str) -> Result<Vec<String>>;
    /// HVALS.
    async fn hvals(&self, key: &str) -> Result<Vec<Vec<u8>>>;

    // Lists

    /// LPUSH / RPUSH; returns the new length.
    async fn push(&self, key: &str, values: &[String], end: ListEnd) -> Result<i64>;
    /// LPOP / RPOP with a count.
    async fn pop(&self, key: &str, count: i64, end: ListEnd) -> Result<Vec<Vec<u8>>>;
    /// LRANGE.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>>;
    /// LLEN.
    async fn llen(&self, key: &str) -> Result<i64>;
    /// LINDEX.
    async fn lindex(&self, key: &str, index: i64) -> Result<Option<Vec<u8>>>;
    /// LSET.
    async fn lset(&self, key: &str, index: i64, value: &str) -> Result<()>;
    /// LTRIM.
    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<()>;

    // Sets

    /// SADD; number of members added.
    async fn sadd(&self, key: &str, members: &[String]) -> Result<i64>;
    /// SREM; number of members removed.
    async fn srem(&self, key: &str, members: &[String]) -> Result<i64>;
    /// SMEMBERS.
    async fn smembers(&self, key: &str) -> Result<Vec<Vec<u8>>>;
    /// SISMEMBER.
    async fn sismember(&self, key: &str, member: &str) -> Result<bool>;
    /// SCARD.
    async fn scard(&self, key: &str) -> Result<i64>;
    /// SPOP with a count.
    async fn spop(&self, key: &str, count: i64) -> Result<Vec<Vec<u8>>>;
    /// SRANDMEMBER with a count.
    async fn srandmember(&self, key: &str, count: i64) -> Result<Vec<Vec<u8>>>;
    /// SINTER.
    async fn sinter(&self, keys: &[String]) -> Result<Vec<Vec<u8>>>;
    /// SUNION.
    async fn sunion(&self, keys: &[String]) -> Result<Vec<Vec<u8>>>;
    /// SDIFF; the first key is the minuend.
    async fn sdiff(&self, keys: &[String]) -> Result<Vec<Vec<u8>>>;

    // Streams

    /// XADD; returns the entry id.
    async fn xadd(&self, key: &str, id: &str, fields: &BTreeMap<String, String>)
        -> Result<String>;
    /// XRANGE.
    async fn xrange(
        &self,
        key: &str,
        start: &str,
        end: &str,
        count: Option<i64>,
    ) -> Result<Vec<StreamEntry>>;
    /// XLEN.
    async fn xlen(&self, key: &str) -> Result<i64>;
    /// XREAD on a single stream, non-blocking.
    async fn xread(&self, key: &str, id: &str, count: Option<i64>) -> Result<Vec<StreamEntry>>;

    // Configuration

    /// CONFIG GET.
    async fn config_get(&self, parameter: &str) -> Result<BTreeMap<String, String>>;
    /// CONFIG SET.
    async fn config_set(&self, parameter: &str, value: &str) -> Result<()>;

    // Cluster

    /// CLUSTER INFO, raw text.
    async fn cluster_info(&self) -> Result<String>;
    /// CLUSTER NODES, raw text.
    async fn cluster_nodes(&self) -> Result<String>;
    /// CLUSTER KEYSLOT.
    async fn cluster_keyslot(&self, key: &str) -> Result<i64>;
    /// CLUSTER COUNTKEYSINSLOT.
    async fn cluster_count_keys_in_slot(&self, slot: i64) -> Result<i64>;

    // Scripting

    /// EVAL; reply converted to JSON.
    async fn eval(&self, script: &str, keys: &[String], args: &[String]) -> Result<JsonValue>;
    /// SCRIPT LOAD; returns the SHA1.
    async fn script_load(&self, script: &str) -> Result<String>;
    /// EVALSHA; reply converted to JSON.
    async fn evalsha(&self, sha: &str, keys: &[String], args: &[String]) -> Result<JsonValue>;
}
