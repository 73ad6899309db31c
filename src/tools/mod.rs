//! Tool layer and category definitions.
//!
//! Every database command is exposed as one tool: parse the input, validate
//! it, call one client method, encode the result. Each category module
//! provides a `register` function; [`register_all`] wires them all.

pub mod base;
pub mod schema;

pub mod cluster;
pub mod config;
pub mod hash;
pub mod key;
pub mod list;
pub mod script;
pub mod server;
pub mod set;
pub mod stream;
pub mod string;

pub use base::{command_tool, BaseTool, CommandTool, Tool, ToolContext};
pub use schema::{derive_schema, FieldSpec, JsonType, NoInput, SchemaType, ToolInput};

use crate::client::SharedClient;
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;

/// Register every tool category.
pub fn register_all(registry: &mut ToolRegistry, client: &SharedClient) {
    server::register(registry, client);
    config::register(registry, client);
    key::register(registry, client);
    string::register(registry, client);
    hash::register(registry, client);
    list::register(registry, client);
    set::register(registry, client);
    stream::register(registry, client);
    cluster::register(registry, client);
    script::register(registry, client);
}

/// Fail with "`<what>` cannot be empty" when `value` is empty.
pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(McpError::validation(format!("{} cannot be empty", what)));
    }
    Ok(())
}

/// Fail with `message` when `items` is empty.
pub(crate) fn require_items<T>(items: &[T], message: &str) -> Result<()> {
    if items.is_empty() {
        return Err(McpError::validation(message));
    }
    Ok(())
}

/// Every key must be non-empty; checked before any command runs.
pub(crate) fn require_keys(keys: &[String]) -> Result<()> {
    keys.iter().try_for_each(|key| require_non_empty(key, "key"))
}

/// Zero means "use the default of one".
pub(crate) fn or_one(amount: i64) -> i64 {
    if amount == 0 {
        1
    } else {
        amount
    }
}
