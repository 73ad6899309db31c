//! MCP server implementation.
//!
//! Handles JSON-RPC 2.0 over newline-delimited stdio according to the MCP
//! protocol specification. Each `tools/call` runs as its own task, so slow
//! commands never hold up other requests; responses are funnelled through a
//! single writer.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{rpc_codes, McpError, Result};
use crate::tools::ToolContext;

/// MCP protocol version we support.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server information.
pub const SERVER_NAME: &str = "valkey-mcp-server";
/// Server version reported during initialization.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, must be "2.0"
    pub jsonrpc: String,
    /// Request id; absent for notifications. An explicit `null` is kept as
    /// `Some(Null)` so it still gets a response.
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<JsonValue>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Option<JsonValue>,
}

/// Only called when the `id` key is present; absence falls back to `None`.
fn present_id<'de, D>(deserializer: D) -> std::result::Result<Option<JsonValue>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Id of the request being answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    /// Result on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Error on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Extra data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<JsonValue>, result: JsonValue) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<JsonValue>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Create an error response from an McpError.
    pub fn from_error(id: Option<JsonValue>, err: McpError) -> Self {
        Self::error(id, err.rpc_code(), err.to_string())
    }
}

/// A tool definition for the MCP tools/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (e.g., "get_string")
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<JsonValue>,
}

impl ToolDef {
    /// Create a new tool definition.
    pub fn new(name: &str, description: &str, input_schema: Option<JsonValue>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Handler invoked for `tools/call`: receives the argument object and
/// returns the structured result object.
pub type ToolHandler = Arc<
    dyn Fn(ToolContext, Map<String, JsonValue>) -> BoxFuture<'static, Result<Map<String, JsonValue>>>
        + Send
        + Sync,
>;

/// Wrap an async function as a [`ToolHandler`].
pub fn tool_handler<F, Fut>(f: F) -> ToolHandler
where
    F: Fn(ToolContext, Map<String, JsonValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Map<String, JsonValue>>> + Send + 'static,
{
    Arc::new(move |ctx: ToolContext, args: Map<String, JsonValue>| f(ctx, args).boxed())
}

struct RegisteredTool {
    def: ToolDef,
    handler: ToolHandler,
}

/// MCP server.
pub struct McpServer {
    tools: BTreeMap<String, RegisteredTool>,
    in_flight: Mutex<HashMap<String, CancellationToken>>,
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new()
    }
}

impl McpServer {
    /// Create a server with no tools.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Add a tool. Names must be unique.
    pub fn add_tool(&mut self, def: ToolDef, handler: ToolHandler) -> Result<()> {
        if self.tools.contains_key(&def.name) {
            return Err(McpError::DuplicateTool(def.name));
        }
        self.tools
            .insert(def.name.clone(), RegisteredTool { def, handler });
        Ok(())
    }

    /// Number of tools exposed.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Run the server, reading from stdin and writing to stdout.
    pub async fn run(self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// Returns once every in-flight call has finished and its response has
    /// been written.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let server = Arc::new(self);
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let (read_result, write_result) =
            tokio::join!(server.read_loop(reader, tx), write_loop(writer, rx));

        read_result?;
        write_result
    }

    async fn read_loop<R>(
        self: &Arc<Self>,
        reader: R,
        tx: mpsc::UnboundedSender<JsonRpcResponse>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut calls = JoinSet::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                // EOF - client disconnected
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => request,
                Err(e) => {
                    let _ = tx.send(JsonRpcResponse::error(
                        None,
                        rpc_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ));
                    continue;
                }
            };

            if request.id.is_none() {
                self.handle_notification(request).await;
                continue;
            }

            if request.method == "tools/call" && request.jsonrpc == "2.0" {
                // Registered before spawning so a cancellation that follows
                // immediately still finds the call.
                let key = in_flight_key(&request.id);
                let token = CancellationToken::new();
                {
                    let mut in_flight = self.in_flight.lock().await;
                    if in_flight.contains_key(&key) {
                        warn!(request_id = %key, "duplicate in-flight request id");
                        let _ = tx.send(JsonRpcResponse::error(
                            request.id,
                            rpc_codes::INVALID_REQUEST,
                            format!("Request id {} is already in flight", key),
                        ));
                        continue;
                    }
                    in_flight.insert(key.clone(), token.clone());
                }

                let server = Arc::clone(self);
                let tx = tx.clone();
                calls.spawn(async move {
                    let response = server.handle_tools_call(request, token).await;
                    server.in_flight.lock().await.remove(&key);
                    if let Some(response) = response {
                        let _ = tx.send(response);
                    }
                });
                continue;
            }

            let _ = tx.send(self.handle_request(request));
        }

        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                warn!("tool call task failed: {}", e);
            }
        }
        Ok(())
    }

    /// Handle a notification. Notifications never get a response.
    async fn handle_notification(&self, request: JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" | "initialized" => {
                debug!("client initialized");
            }
            "notifications/cancelled" => {
                let request_id = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .map(|id| id.to_string());
                if let Some(request_id) = request_id {
                    if let Some(token) = self.in_flight.lock().await.get(&request_id) {
                        debug!(request_id = %request_id, "cancelling tool call");
                        token.cancel();
                    }
                }
            }
            other => debug!(method = other, "ignoring notification"),
        }
    }

    /// Handle a single JSON-RPC request other than `tools/call`.
    fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        // Validate JSON-RPC version
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                request.id,
                rpc_codes::INVALID_REQUEST,
                "Invalid JSON-RPC version".to_string(),
            );
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "tools/list" => self.handle_tools_list(request),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            _ => JsonRpcResponse::error(
                request.id,
                rpc_codes::METHOD_NOT_FOUND,
                format!("Unknown method: {}", request.method),
            ),
        }
    }

    /// Handle the initialize request.
    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        info!("client connected");
        JsonRpcResponse::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    /// Handle the tools/list request.
    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<JsonValue> = self
            .tools
            .values()
            .map(|t| {
                // MCP requires an input schema even for parameterless tools
                let schema = t
                    .def
                    .input_schema
                    .clone()
                    .unwrap_or_else(|| json!({"type": "object", "properties": {}}));
                json!({
                    "name": t.def.name,
                    "description": t.def.description,
                    "inputSchema": schema
                })
            })
            .collect();

        JsonRpcResponse::success(request.id, json!({ "tools": tools }))
    }

    /// Handle the tools/call request. Returns `None` when the caller
    /// cancelled the request.
    async fn handle_tools_call(
        &self,
        request: JsonRpcRequest,
        token: CancellationToken,
    ) -> Option<JsonRpcResponse> {
        let params = match &request.params {
            Some(JsonValue::Object(obj)) => obj,
            _ => {
                return Some(JsonRpcResponse::error(
                    request.id,
                    rpc_codes::INVALID_PARAMS,
                    "Missing params object".to_string(),
                ))
            }
        };

        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n.to_string(),
            None => {
                return Some(JsonRpcResponse::error(
                    request.id,
                    rpc_codes::INVALID_PARAMS,
                    "Missing 'name' in params".to_string(),
                ))
            }
        };

        let arguments = match params.get("arguments") {
            Some(JsonValue::Object(obj)) => obj.clone(),
            Some(JsonValue::Null) | None => Map::new(),
            _ => {
                return Some(JsonRpcResponse::error(
                    request.id,
                    rpc_codes::INVALID_PARAMS,
                    "'arguments' must be an object".to_string(),
                ))
            }
        };

        let handler = match self.tools.get(&name) {
            Some(tool) => Arc::clone(&tool.handler),
            None => {
                return Some(JsonRpcResponse::from_error(
                    request.id,
                    McpError::ToolNotFound(name),
                ))
            }
        };

        debug!(tool = %name, "tools/call");
        let outcome = handler(ToolContext::with_token(token.clone()), arguments).await;

        if token.is_cancelled() {
            debug!(tool = %name, "tool call cancelled, dropping response");
            return None;
        }

        let result = match outcome {
            Ok(structured) => {
                let text = serde_json::to_string(&structured).unwrap_or_else(|_| "{}".to_string());
                json!({
                    "content": [{ "type": "text", "text": text }],
                    "structuredContent": structured
                })
            }
            Err(err) => {
                warn!(tool = %name, "tool call failed: {}", err);
                json!({
                    "content": [{ "type": "text", "text": err.to_string() }],
                    "isError": true
                })
            }
        };
        Some(JsonRpcResponse::success(request.id, result))
    }
}

/// Key under which an in-flight call is tracked; matches the `requestId`
/// of a cancellation notification.
fn in_flight_key(id: &Option<JsonValue>) -> String {
    id.as_ref().map(|id| id.to_string()).unwrap_or_default()
}

async fn write_loop<W>(writer: W, mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = writer;
    while let Some(response) = rx.recv().await {
        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_handler() -> ToolHandler {
        tool_handler(|_ctx, args| async move { Ok(args) })
    }

    async fn run_lines(server: McpServer, input: &str) -> Vec<JsonValue> {
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_json_rpc_response_success() {
        let response = JsonRpcResponse::success(Some(JsonValue::Number(1.into())), json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_json_rpc_response_error() {
        let response = JsonRpcResponse::error(Some(JsonValue::Number(1.into())), -32600, "Invalid".to_string());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"error\""));
        assert!(!json.contains("\"result\""));
    }

    #[test]
    fn test_add_tool_rejects_duplicates() {
        let mut server = McpServer::new();
        server
            .add_tool(ToolDef::new("echo", "Echo", None), echo_handler())
            .unwrap();
        let err = server
            .add_tool(ToolDef::new("echo", "Echo", None), echo_handler())
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(server.tool_count(), 1);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#, "\n",
        );
        let responses = run_lines(McpServer::new(), input).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let responses = run_lines(McpServer::new(), "{oops\n").await;
        assert_eq!(responses[0]["error"]["code"], rpc_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_tools_list_fills_missing_schema() {
        let mut server = McpServer::new();
        server
            .add_tool(ToolDef::new("echo", "Echo", None), echo_handler())
            .unwrap();
        let responses =
            run_lines(server, "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n").await;
        let tool = &responses[0]["result"]["tools"][0];
        assert_eq!(tool["name"], "echo");
        assert_eq!(tool["inputSchema"], json!({"type": "object", "properties": {}}));
    }

    #[tokio::test]
    async fn test_tools_call_failure_is_tool_error() {
        let mut server = McpServer::new();
        let failing = tool_handler(|_ctx, _args| async {
            Err(McpError::validation("key cannot be empty"))
        });
        server
            .add_tool(ToolDef::new("fail", "Always fails", None), failing)
            .unwrap();
        let input = r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"fail"}}"#;
        let responses = run_lines(server, &format!("{}\n", input)).await;
        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "key cannot be empty");
    }

    #[tokio::test]
    async fn test_cancelled_call_sends_no_response() {
        let mut server = McpServer::new();
        let waits = tool_handler(|ctx, _args| async move {
            ctx.token().cancelled().await;
            Err(McpError::Cancelled)
        });
        server
            .add_tool(ToolDef::new("wait", "Waits for cancellation", None), waits)
            .unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"wait"}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#, "\n",
        );
        let responses = run_lines(server, input).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rpc_error() {
        let input = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope"}}"#;
        let responses = run_lines(McpServer::new(), &format!("{}\n", input)).await;
        assert_eq!(responses[0]["error"]["code"], rpc_codes::METHOD_NOT_FOUND);
        assert_eq!(responses[0]["error"]["message"], "tool not found: nope");
    }

    #[tokio::test]
    async fn test_null_id_is_a_request() {
        let input = r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#;
        let responses = run_lines(McpServer::new(), &format!("{}\n", input)).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].get("id"), Some(&JsonValue::Null));
        assert_eq!(responses[0]["result"], json!({}));

        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(request.id.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_id_rejected() {
        let mut server = McpServer::new();
        let waits = tool_handler(|ctx, _args| async move {
            ctx.token().cancelled().await;
            Err(McpError::Cancelled)
        });
        server
            .add_tool(ToolDef::new("wait", "Waits for cancellation", None), waits)
            .unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"wait"}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"wait"}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":7}}"#, "\n",
        );
        let responses = run_lines(server, input).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 7);
        assert_eq!(responses[0]["error"]["code"], rpc_codes::INVALID_REQUEST);
    }
}
