//! Server configuration tools.
//!
//! Tools: config_get, config_set

use std::collections::BTreeMap;

use serde::Serialize;

use crate::client::SharedClient;
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, require_non_empty};

tool_input! {
    struct GetInput {
        #[field("parameter", "required,description=Configuration parameter name to retrieve")]
        parameter: String,
    }
}

tool_input! {
    struct SetInput {
        #[field("parameter", "required,description=Configuration parameter name")]
        parameter: String,
        #[field("value", "required,description=Value to set for the parameter")]
        value: String,
    }
}

#[derive(Debug, Serialize)]
struct GetOutput {
    parameters: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SetOutput {
    success: bool,
    message: String,
}

/// Register the configuration tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "config_get",
        "Get Redis/Valkey server configuration parameters",
        client,
        config_get,
    ));
    registry.must_register(command_tool(
        "config_set",
        "Set Redis/Valkey server configuration parameters",
        client,
        config_set,
    ));
}

async fn config_get(client: SharedClient, input: GetInput) -> Result<GetOutput> {
    require_non_empty(&input.parameter, "parameter")?;
    let parameters = client
        .config_get(&input.parameter)
        .await
        .map_err(|e| McpError::upstream("failed to get config", e))?;
    Ok(GetOutput { parameters })
}

async fn config_set(client: SharedClient, input: SetInput) -> Result<SetOutput> {
    require_non_empty(&input.parameter, "parameter")?;
    require_non_empty(&input.value, "value")?;
    client
        .config_set(&input.parameter, &input.value)
        .await
        .map_err(|e| McpError::upstream("failed to set config", e))?;
    Ok(SetOutput {
        success: true,
        message: "Configuration updated successfully".to_string(),
    })
}
