//! The tool capability and the shared base every command tool builds on.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use crate::client::SharedClient;
use crate::error::{McpError, Result};
use crate::tools::schema::ToolInput;

/// Per-call context handed to every tool.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    cancel: CancellationToken,
}

impl ToolContext {
    /// A context that is never cancelled unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context tied to an existing token.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// The cancellation token for this call.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Abort the call.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the call was aborted.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A named, self-describing operation callable by an MCP client.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Input schema, or `None` when the tool takes no input.
    fn input_schema(&self) -> Option<&JsonValue>;

    /// Run the tool on raw JSON input.
    async fn execute(&self, ctx: &ToolContext, input: &[u8]) -> Result<JsonValue>;
}

/// Name, description and derived schema shared by every tool.
#[derive(Debug, Clone)]
pub struct BaseTool {
    name: String,
    description: String,
    input_schema: Option<JsonValue>,
}

impl BaseTool {
    /// Build a base whose schema is derived from `I`.
    pub fn new<I: ToolInput>(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: I::schema(),
        }
    }

    /// Build a base for a tool with no input.
    pub fn without_input(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: None,
        }
    }

    /// Decode raw input into `I`.
    ///
    /// Empty input (including whitespace or a bare `null`) yields
    /// `I::default()`; unknown fields are ignored.
    pub fn parse_input<I: ToolInput>(input: &[u8]) -> Result<I> {
        if input.iter().all(u8::is_ascii_whitespace) {
            return Ok(I::default());
        }
        let value: JsonValue = serde_json::from_slice(input)
            .map_err(|e| McpError::InvalidInput(e.to_string()))?;
        if value.is_null() {
            return Ok(I::default());
        }
        serde_json::from_value(value).map_err(|e| McpError::InvalidInput(e.to_string()))
    }
}

#[async_trait]
impl Tool for BaseTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Option<&JsonValue> {
        self.input_schema.as_ref()
    }

    async fn execute(&self, _ctx: &ToolContext, _input: &[u8]) -> Result<JsonValue> {
        Err(McpError::NotImplemented(self.name.clone()))
    }
}

/// A tool that parses `I`, runs one handler against the client and returns
/// the serialized output.
pub struct CommandTool<I, F> {
    base: BaseTool,
    client: SharedClient,
    handler: F,
    _input: PhantomData<fn() -> I>,
}

impl<I, F> CommandTool<I, F>
where
    I: ToolInput,
{
    /// Wrap `handler` as a tool.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        client: SharedClient,
        handler: F,
    ) -> Self {
        Self {
            base: BaseTool::new::<I>(name, description),
            client,
            handler,
            _input: PhantomData,
        }
    }
}

#[async_trait]
impl<I, O, F, Fut> Tool for CommandTool<I, F>
where
    I: ToolInput,
    O: Serialize + Send + 'static,
    F: Fn(SharedClient, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    fn name(&self) -> &str {
        self.base.name()
    }

    fn description(&self) -> &str {
        self.base.description()
    }

    fn input_schema(&self) -> Option<&JsonValue> {
        self.base.input_schema()
    }

    async fn execute(&self, _ctx: &ToolContext, input: &[u8]) -> Result<JsonValue> {
        let params = BaseTool::parse_input::<I>(input)?;
        let output = (self.handler)(self.client.clone(), params).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Shorthand for boxing a [`CommandTool`].
pub fn command_tool<I, O, F, Fut>(
    name: &str,
    description: &str,
    client: &SharedClient,
    handler: F,
) -> std::sync::Arc<dyn Tool>
where
    I: ToolInput,
    O: Serialize + Send + 'static,
    F: Fn(SharedClient, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    std::sync::Arc::new(CommandTool::<I, F>::new(
        name,
        description,
        client.clone(),
        handler,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockValkeyClient;
    use std::sync::Arc;

    crate::tool_input! {
        struct EchoInput {
            #[field("key", "required,description=Key")]
            key: String,
            #[field("count")]
            count: i64,
        }
    }

    #[test]
    fn test_parse_input_empty_is_default() {
        let inputs: [&[u8]; 3] = [b"", b"   ", b"null"];
        for raw in inputs {
            let parsed: EchoInput = BaseTool::parse_input(raw).unwrap();
            assert_eq!(parsed.key, "");
            assert_eq!(parsed.count, 0);
        }
    }

    #[test]
    fn test_parse_input_ignores_unknown_fields() {
        let parsed: EchoInput =
            BaseTool::parse_input(br#"{"key":"a","count":2,"extra":true}"#).unwrap();
        assert_eq!(parsed.key, "a");
        assert_eq!(parsed.count, 2);
    }

    #[test]
    fn test_parse_input_rejects_malformed() {
        let err = BaseTool::parse_input::<EchoInput>(b"{not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid input format:"));

        let err = BaseTool::parse_input::<EchoInput>(br#"{"count":"many"}"#).unwrap_err();
        assert!(matches!(err, McpError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_base_execute_not_implemented() {
        let tool = BaseTool::new::<EchoInput>("echo", "Echo");
        let err = tool.execute(&ToolContext::new(), b"{}").await.unwrap_err();
        assert_eq!(err.to_string(), "execute not implemented for tool echo");
    }

    #[test]
    fn test_base_schema_presence() {
        let with = BaseTool::new::<EchoInput>("echo", "Echo");
        assert_eq!(with.input_schema().unwrap()["required"][0], "key");

        let without = BaseTool::without_input("ping", "Ping");
        assert!(without.input_schema().is_none());
    }

    #[tokio::test]
    async fn test_command_tool_runs_handler() {
        let client: SharedClient = Arc::new(MockValkeyClient::new());
        let tool = command_tool(
            "echo",
            "Echo the key",
            &client,
            |_client, input: EchoInput| async move {
                Ok::<_, McpError>(serde_json::json!({ "key": input.key, "count": input.count }))
            },
        );
        let out = tool
            .execute(&ToolContext::new(), br#"{"key":"k","count":3}"#)
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!({"key": "k", "count": 3}));
        assert_eq!(tool.name(), "echo");
    }
}
