//! Tool registry.
//!
//! Holds every tool by name, executes them on behalf of callers and bridges
//! them into the MCP server. Tools are registered during startup through
//! `&mut self`; once shared behind an `Arc` the registry is read-only.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::{McpError, Result};
use crate::server::{tool_handler, McpServer, ToolDef};
use crate::tools::{Tool, ToolContext};

/// Introspection record for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Input schema; omitted for tools without input
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<JsonValue>,
}

/// Registry of all available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if the name is taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(McpError::DuplicateTool(name));
        }
        debug!(tool = %name, "registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Register a tool, panicking if the name is taken.
    ///
    /// Only for startup wiring, where a duplicate is a programming error.
    pub fn must_register(&mut self, tool: Arc<dyn Tool>) {
        if let Err(err) = self.register(tool) {
            panic!("{}", err);
        }
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Names of all registered tools, sorted.
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Name, description and schema of every tool, sorted by name.
    pub fn all_tool_info(&self) -> Vec<ToolInfo> {
        self.sorted_tools()
            .into_iter()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema().cloned(),
            })
            .collect()
    }

    /// Execute a tool by name on raw JSON input.
    pub async fn execute_tool(
        &self,
        ctx: &ToolContext,
        name: &str,
        input: &[u8],
    ) -> Result<JsonValue> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        run_tool(tool.as_ref(), ctx, input).await
    }

    /// Expose every tool through the MCP server.
    ///
    /// Arguments arrive as a JSON object and are re-encoded before being
    /// handed to the tool; an empty object becomes empty input. The tool's
    /// result must be a JSON object.
    pub fn register_with_server(&self, server: &mut McpServer) -> Result<()> {
        for tool in self.sorted_tools() {
            let def = ToolDef::new(tool.name(), tool.description(), tool.input_schema().cloned());
            let handler = tool_handler(move |ctx, args| {
                let tool = Arc::clone(&tool);
                async move { call_with_arguments(tool.as_ref(), &ctx, args).await }
            });
            server.add_tool(def, handler)?;
        }
        Ok(())
    }

    fn sorted_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }
}

/// Run one tool, honoring cancellation and attaching the tool name to errors.
async fn run_tool(tool: &dyn Tool, ctx: &ToolContext, input: &[u8]) -> Result<JsonValue> {
    debug!(tool = tool.name(), "executing tool");
    let result = tokio::select! {
        biased;
        _ = ctx.token().cancelled() => Err(McpError::Cancelled),
        result = tool.execute(ctx, input) => result,
    };
    result.map_err(|source| {
        warn!(tool = tool.name(), "tool failed: {}", source);
        McpError::ToolFailed {
            name: tool.name().to_string(),
            source: Box::new(source),
        }
    })
}

async fn call_with_arguments(
    tool: &dyn Tool,
    ctx: &ToolContext,
    args: Map<String, JsonValue>,
) -> Result<Map<String, JsonValue>> {
    let input = if args.is_empty() {
        Vec::new()
    } else {
        serde_json::to_vec(&args)?
    };

    match run_tool(tool, ctx, &input).await? {
        JsonValue::Object(map) => Ok(map),
        other => Err(McpError::Protocol(format!(
            "tool {} returned a non-object result: {}",
            tool.name(),
            other
        ))),
    }
}
