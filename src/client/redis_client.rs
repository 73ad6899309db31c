//! [`ValkeyClient`] over the `redis` crate's auto-reconnecting connection
//! manager.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{FromRedisValue, Value};
use serde_json::Value as JsonValue;

use super::reply;
use super::{
    ListEnd, Result, SetCondition, SlowlogEntry, StreamEntry, ValkeyClient, ValkeyError,
};
use crate::encoding::reply_to_json;

/// Upper bound on connecting and on the startup PING.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client backed by a multiplexed, reconnecting connection.
///
/// Cloning is cheap; every call works on its own clone of the manager so
/// calls from concurrent tool invocations never contend on a lock.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    /// Connect and verify the server answers PING.
    pub async fn connect(url: &str) -> Result<Self> {
        let client =
            redis::Client::open(url).map_err(|e| ValkeyError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| ValkeyError::Connection("timed out".to_string()))?
            .map_err(|e| ValkeyError::Connection(e.to_string()))?;

        let this = Self { conn };
        tokio::time::timeout(CONNECT_TIMEOUT, this.ping())
            .await
            .map_err(|_| ValkeyError::Connection("PING timed out".to_string()))?
            .map_err(|e| ValkeyError::Connection(e.to_string()))?;

        Ok(this)
    }

    async fn query<T>(&self, command: &'static str, cmd: redis::Cmd) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let mut conn = self.conn.clone();
        cmd.query_async(&mut conn)
            .await
            .map_err(|source| ValkeyError::Command { command, source })
    }

    async fn query_raw(&self, command: &'static str, cmd: redis::Cmd) -> Result<Value> {
        self.query::<Value>(command, cmd).await
    }
}

fn list_command(end: ListEnd, head: &'static str, tail: &'static str) -> &'static str {
    match end {
        ListEnd::Head => head,
        ListEnd::Tail => tail,
    }
}

fn script_cmd(name: &str, body: &str, keys: &[String], args: &[String]) -> redis::Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(body).arg(keys.len()).arg(keys).arg(args);
    cmd
}

#[async_trait]
impl ValkeyClient for RedisClient {
    async fn ping(&self) -> Result<()> {
        self.query::<String>("PING", redis::cmd("PING"))
            .await
            .map(|_| ())
    }

    async fn info(&self) -> Result<String> {
        self.query("INFO", redis::cmd("INFO")).await
    }

    async fn client_list(&self) -> Result<String> {
        let mut cmd = redis::cmd("CLIENT");
        cmd.arg("LIST");
        self.query("CLIENT LIST", cmd).await
    }

    async fn dbsize(&self) -> Result<i64> {
        self.query("DBSIZE", redis::cmd("DBSIZE")).await
    }

    async fn slowlog_get(&self, count: Option<i64>) -> Result<Vec<SlowlogEntry>> {
        let mut cmd = redis::cmd("SLOWLOG");
        cmd.arg("GET");
        if let Some(count) = count {
            cmd.arg(count);
        }
        let raw = self.query_raw("SLOWLOG GET", cmd).await?;
        reply::parse_slowlog("SLOWLOG GET", raw)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query("GET", cmd).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<i64>,
        condition: SetCondition,
    ) -> Result<bool> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl_seconds {
            cmd.arg("EX").arg(ttl);
        }
        match condition {
            SetCondition::Always => {}
            SetCondition::IfAbsent => {
                cmd.arg("NX");
            }
            SetCondition::IfExists => {
                cmd.arg("XX");
            }
        }
        let raw = self.query_raw("SET", cmd).await?;
        Ok(!matches!(raw, Value::Nil))
    }

    async fn incr_by(&self, key: &str, amount: i64) -> Result<i64> {
        let mut cmd = redis::cmd("INCRBY");
        cmd.arg(key).arg(amount);
        self.query("INCRBY", cmd).await
    }

    async fn decr_by(&self, key: &str, amount: i64) -> Result<i64> {
        let mut cmd = redis::cmd("DECRBY");
        cmd.arg(key).arg(amount);
        self.query("DECRBY", cmd).await
    }

    async fn append(&self, key: &str, value: &str) -> Result<i64> {
        let mut cmd = redis::cmd("APPEND");
        cmd.arg(key).arg(value);
        self.query("APPEND", cmd).await
    }

    async fn get_range(&self, key: &str, start: i64, end: i64) -> Result<Vec<u8>> {
        let mut cmd = redis::cmd("GETRANGE");
        cmd.arg(key).arg(start).arg(end);
        self.query("GETRANGE", cmd).await
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.query("DEL", cmd).await
    }

    async fn exists(&self, keys: &[String]) -> Result<i64> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(keys);
        self.query("EXISTS", cmd).await
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<bool> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(seconds);
        self.query("EXPIRE", cmd).await
    }

    async fn persist(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("PERSIST");
        cmd.arg(key);
        self.query("PERSIST", cmd).await
    }

    async fn rename(&self, key: &str, new_key: &str) -> Result<()> {
        let mut cmd = redis::cmd("RENAME");
        cmd.arg(key).arg(new_key);
        self.query("RENAME", cmd).await
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("TTL");
        cmd.arg(key);
        self.query("TTL", cmd).await
    }

    async fn key_type(&self, key: &str) -> Result<String> {
        let mut cmd = redis::cmd("TYPE");
        cmd.arg(key);
        self.query("TYPE", cmd).await
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: Option<i64>,
    ) -> Result<(u64, Vec<String>)> {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor).arg("MATCH").arg(pattern);
        if let Some(count) = count {
            cmd.arg("COUNT").arg(count);
        }
        self.query("SCAN", cmd).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut cmd = redis::cmd("KEYS");
        cmd.arg(pattern);
        self.query("KEYS", cmd).await
    }

    async fn touch(&self, keys: &[String]) -> Result<i64> {
        let mut cmd = redis::cmd("TOUCH");
        cmd.arg(keys);
        self.query("TOUCH", cmd).await
    }

    async fn memory_usage(&self, key: &str) -> Result<Option<i64>> {
        let mut cmd = redis::cmd("MEMORY");
        cmd.arg("USAGE").arg(key);
        self.query("MEMORY USAGE", cmd).await
    }

    async fn object_encoding(&self, key: &str) -> Result<Option<String>> {
        let mut cmd = redis::cmd("OBJECT");
        cmd.arg("ENCODING").arg(key);
        self.query("OBJECT ENCODING", cmd).await
    }

    async fn object_idletime(&self, key: &str) -> Result<Option<i64>> {
        let mut cmd = redis::cmd("OBJECT");
        cmd.arg("IDLETIME").arg(key);
        self.query("OBJECT IDLETIME", cmd).await
    }

    async fn dump(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("DUMP");
        cmd.arg(key);
        self.query("DUMP", cmd).await
    }

    async fn restore(&self, key: &str, ttl_millis: i64, payload: &[u8]) -> Result<()> {
        let mut cmd = redis::cmd("RESTORE");
        cmd.arg(key).arg(ttl_millis).arg(payload);
        self.query("RESTORE", cmd).await
    }

    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut cmd = redis::cmd("HGETALL");
        cmd.arg(key);
        let raw = self.query_raw("HGETALL", cmd).await?;
        reply::parse_hash("HGETALL", raw)
    }

    async fn hset(&self, key: &str, fields: &BTreeMap<String, String>) -> Result<i64> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        self.query("HSET", cmd).await
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("HGET");
        cmd.arg(key).arg(field);
        self.query("HGET", cmd).await
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key).arg(fields);
        self.query("HMGET", cmd).await
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<i64> {
        let mut cmd = redis::cmd("HDEL");
        cmd.arg(key).arg(fields);
        self.query("HDEL", cmd).await
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        let mut cmd = redis::cmd("HEXISTS");
        cmd.arg(key).arg(field);
        self.query("HEXISTS", cmd).await
    }

    async fn hincr_by(&self, key: &str, field: &str, amount: i64) -> Result<i64> {
        let mut cmd = redis::cmd("HINCRBY");
        cmd.arg(key).arg(field).arg(amount);
        self.query("HINCRBY", cmd).await
    }

    async fn hlen(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("HLEN");
        cmd.arg(key);
        self.query("HLEN", cmd).await
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        let mut cmd = redis::cmd("HKEYS");
        cmd.arg(key);
        self.query("HKEYS", cmd).await
    }

    async fn hvals(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("HVALS");
        cmd.arg(key);
        self.query("HVALS", cmd).await
    }

    async fn push(&self, key: &str, values: &[String], end: ListEnd) -> Result<i64> {
        let name = list_command(end, "LPUSH", "RPUSH");
        let mut cmd = redis::cmd(name);
        cmd.arg(key).arg(values);
        self.query(name, cmd).await
    }

    async fn pop(&self, key: &str, count: i64, end: ListEnd) -> Result<Vec<Vec<u8>>> {
        let name = list_command(end, "LPOP", "RPOP");
        let mut cmd = redis::cmd(name);
        cmd.arg(key).arg(count);
        let popped: Option<Vec<Vec<u8>>> = self.query(name, cmd).await?;
        Ok(popped.unwrap_or_default())
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("LRANGE");
        cmd.arg(key).arg(start).arg(stop);
        self.query("LRANGE", cmd).await
    }

    async fn llen(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("LLEN");
        cmd.arg(key);
        self.query("LLEN", cmd).await
    }

    async fn lindex(&self, key: &str, index: i64) -> Result<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("LINDEX");
        cmd.arg(key).arg(index);
        self.query("LINDEX", cmd).await
    }

    async fn lset(&self, key: &str, index: i64, value: &str) -> Result<()> {
        let mut cmd = redis::cmd("LSET");
        cmd.arg(key).arg(index).arg(value);
        self.query("LSET", cmd).await
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<()> {
        let mut cmd = redis::cmd("LTRIM");
        cmd.arg(key).arg(start).arg(stop);
        self.query("LTRIM", cmd).await
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<i64> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key).arg(members);
        self.query("SADD", cmd).await
    }

    async fn srem(&self, key: &str, members: &[String]) -> Result<i64> {
        let mut cmd = redis::cmd("SREM");
        cmd.arg(key).arg(members);
        self.query("SREM", cmd).await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        self.query("SMEMBERS", cmd).await
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let mut cmd = redis::cmd("SISMEMBER");
        cmd.arg(key).arg(member);
        self.query("SISMEMBER", cmd).await
    }

    async fn scard(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("SCARD");
        cmd.arg(key);
        self.query("SCARD", cmd).await
    }

    async fn spop(&self, key: &str, count: i64) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("SPOP");
        cmd.arg(key).arg(count);
        let popped: Option<Vec<Vec<u8>>> = self.query("SPOP", cmd).await?;
        Ok(popped.unwrap_or_default())
    }

    async fn srandmember(&self, key: &str, count: i64) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("SRANDMEMBER");
        cmd.arg(key).arg(count);
        let members: Option<Vec<Vec<u8>>> = self.query("SRANDMEMBER", cmd).await?;
        Ok(members.unwrap_or_default())
    }

    async fn sinter(&self, keys: &[String]) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("SINTER");
        cmd.arg(keys);
        self.query("SINTER", cmd).await
    }

    async fn sunion(&self, keys: &[String]) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("SUNION");
        cmd.arg(keys);
        self.query("SUNION", cmd).await
    }

    async fn sdiff(&self, keys: &[String]) -> Result<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("SDIFF");
        cmd.arg(keys);
        self.query("SDIFF", cmd).await
    }

    async fn xadd(
        &self,
        key: &str,
        id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String> {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(key).arg(id);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        self.query("XADD", cmd).await
    }

    async fn xrange(
        &self,
        key: &str,
        start: &str,
        end: &str,
        count: Option<i64>,
    ) -> Result<Vec<StreamEntry>> {
        let mut cmd = redis::cmd("XRANGE");
        cmd.arg(key).arg(start).arg(end);
        if let Some(count) = count {
            cmd.arg("COUNT").arg(count);
        }
        let raw = self.query_raw("XRANGE", cmd).await?;
        reply::parse_stream_entries("XRANGE", raw)
    }

    async fn xlen(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("XLEN");
        cmd.arg(key);
        self.query("XLEN", cmd).await
    }

    async fn xread(&self, key: &str, id: &str, count: Option<i64>) -> Result<Vec<StreamEntry>> {
        let mut cmd = redis::cmd("XREAD");
        if let Some(count) = count {
            cmd.arg("COUNT").arg(count);
        }
        cmd.arg("STREAMS").arg(key).arg(id);
        let raw = self.query_raw("XREAD", cmd).await?;
        reply::parse_xread("XREAD", key, raw)
    }

    async fn config_get(&self, parameter: &str) -> Result<BTreeMap<String, String>> {
        let mut cmd = redis::cmd("CONFIG");
        cmd.arg("GET").arg(parameter);
        let raw = self.query_raw("CONFIG GET", cmd).await?;
        reply::parse_config("CONFIG GET", raw)
    }

    async fn config_set(&self, parameter: &str, value: &str) -> Result<()> {
        let mut cmd = redis::cmd("CONFIG");
        cmd.arg("SET").arg(parameter).arg(value);
        self.query("CONFIG SET", cmd).await
    }

    async fn cluster_info(&self) -> Result<String> {
        let mut cmd = redis::cmd("CLUSTER");
        cmd.arg("INFO");
        self.query("CLUSTER INFO", cmd).await
    }

    async fn cluster_nodes(&self) -> Result<String> {
        let mut cmd = redis::cmd("CLUSTER");
        cmd.arg("NODES");
        self.query("CLUSTER NODES", cmd).await
    }

    async fn cluster_keyslot(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("CLUSTER");
        cmd.arg("KEYSLOT").arg(key);
        self.query("CLUSTER KEYSLOT", cmd).await
    }

    async fn cluster_count_keys_in_slot(&self, slot: i64) -> Result<i64> {
        let mut cmd = redis::cmd("CLUSTER");
        cmd.arg("COUNTKEYSINSLOT").arg(slot);
        self.query("CLUSTER COUNTKEYSINSLOT", cmd).await
    }

    async fn eval(&self, script: &str, keys: &[String], args: &[String]) -> Result<JsonValue> {
        let raw = self
            .query_raw("EVAL", script_cmd("EVAL", script, keys, args))
            .await?;
        Ok(reply_to_json(raw))
    }

    async fn script_load(&self, script: &str) -> Result<String> {
        let mut cmd = redis::cmd("SCRIPT");
        cmd.arg("LOAD").arg(script);
        self.query("SCRIPT LOAD", cmd).await
    }

    async fn evalsha(&self, sha: &str, keys: &[String], args: &[String]) -> Result<JsonValue> {
        let raw = self
            .query_raw("EVALSHA", script_cmd("EVALSHA", sha, keys, args))
            .await?;
        Ok(reply_to_json(raw))
    }
}
