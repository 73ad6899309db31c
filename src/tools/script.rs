//! Lua scripting tools.
//!
//! Tools: eval_script, script_load, evalsha_script

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::client::SharedClient;
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, require_non_empty};

tool_input! {
    struct EvalInput {
        #[field("script", "required,description=Lua script to execute")]
        script: String,
        #[field("keys", "description=Keys that the script will access")]
        keys: Vec<String>,
        #[field("args", "description=Additional arguments for the script")]
        args: Vec<String>,
    }
}

tool_input! {
    struct LoadInput {
        #[field("script", "required,description=Lua script to load")]
        script: String,
    }
}

tool_input! {
    struct EvalshaInput {
        #[field("sha", "required,description=SHA1 hash of the loaded script")]
        sha: String,
        #[field("keys", "description=Keys that the script will access")]
        keys: Vec<String>,
        #[field("args", "description=Additional arguments for the script")]
        args: Vec<String>,
    }
}

#[derive(Debug, Serialize)]
struct EvalOutput {
    result: JsonValue,
}

#[derive(Debug, Serialize)]
struct LoadOutput {
    sha: String,
}

/// Register the scripting tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "eval_script",
        "Execute a Lua script on Redis/Valkey server",
        client,
        eval_script,
    ));
    registry.must_register(command_tool(
        "script_load",
        "Load a Lua script into Redis/Valkey and return its SHA1 hash",
        client,
        script_load,
    ));
    registry.must_register(command_tool(
        "evalsha_script",
        "Execute a previously loaded Lua script by its SHA1 hash",
        client,
        evalsha_script,
    ));
}

async fn eval_script(client: SharedClient, input: EvalInput) -> Result<EvalOutput> {
    require_non_empty(&input.script, "script")?;
    let result = client
        .eval(&input.script, &input.keys, &input.args)
        .await
        .map_err(|e| McpError::upstream("failed to execute script", e))?;
    Ok(EvalOutput { result })
}

async fn script_load(client: SharedClient, input: LoadInput) -> Result<LoadOutput> {
    require_non_empty(&input.script, "script")?;
    let sha = client
        .script_load(&input.script)
        .await
        .map_err(|e| McpError::upstream("failed to load script", e))?;
    Ok(LoadOutput { sha })
}

async fn evalsha_script(client: SharedClient, input: EvalshaInput) -> Result<EvalOutput> {
    require_non_empty(&input.sha, "sha")?;
    let result = client
        .evalsha(&input.sha, &input.keys, &input.args)
        .await
        .map_err(|e| McpError::upstream("failed to execute script", e))?;
    Ok(EvalOutput { result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockValkeyClient;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_eval_passes_keys_and_args() {
        let mut mock = MockValkeyClient::new();
        mock.expect_eval()
            .withf(|script, keys, args| {
                script == "return {KEYS[1], ARGV[1]}" && *keys == ["k"] && *args == ["a"]
            })
            .returning(|_, _, _| Ok(json!(["k", "a"])));
        let out = eval_script(
            Arc::new(mock),
            EvalInput {
                script: "return {KEYS[1], ARGV[1]}".into(),
                keys: vec!["k".into()],
                args: vec!["a".into()],
            },
        )
        .await
        .unwrap();
        assert_eq!(serde_json::to_value(out).unwrap(), json!({"result": ["k", "a"]}));
    }

    #[tokio::test]
    async fn test_eval_without_keys() {
        let mut mock = MockValkeyClient::new();
        mock.expect_eval()
            .withf(|_, keys, args| keys.is_empty() && args.is_empty())
            .returning(|_, _, _| Ok(json!(1)));
        let out = eval_script(
            Arc::new(mock),
            EvalInput {
                script: "return 1".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(out.result, json!(1));
    }

    #[tokio::test]
    async fn test_script_validation() {
        let client: SharedClient = Arc::new(MockValkeyClient::new());
        let err = script_load(client.clone(), LoadInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "script cannot be empty");
        let err = evalsha_script(client, EvalshaInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "sha cannot be empty");
    }

    #[tokio::test]
    async fn test_load_then_evalsha() {
        let mut mock = MockValkeyClient::new();
        mock.expect_script_load()
            .returning(|_| Ok("e0e1f9fabfc9d4800c877a703b823ac0578ff8db".into()));
        mock.expect_evalsha()
            .withf(|sha, _, _| sha == "e0e1f9fabfc9d4800c877a703b823ac0578ff8db")
            .returning(|_, _, _| Ok(JsonValue::Null));
        let client: SharedClient = Arc::new(mock);

        let loaded = script_load(
            client.clone(),
            LoadInput {
                script: "return nil".into(),
            },
        )
        .await
        .unwrap();
        let out = evalsha_script(
            client,
            EvalshaInput {
                sha: loaded.sha,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(out.result, JsonValue::Null);
    }
}
