use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use macro_tracker_core::{NutritionStore, call_tool, tool_definitions};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2025-06-18";

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    jsonrpc: Option<String>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

#[derive(Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// MCP over stdio: newline-delimited JSON-RPC 2.0 on stdin/stdout.
///
/// Serves `initialize`, `ping`, `tools/list` and `tools/call`. Logs go to
/// stderr so stdout carries only protocol messages.
#[derive(Clone)]
pub struct McpServer {
    store: NutritionStore,
}

impl McpServer {
    pub fn new(store: NutritionStore) -> Self {
        Self { store }
    }

    /// Handle one line of input. Returns `None` for notifications, which are
    /// messages without an `id` member (an explicit `null` id still gets a reply).
    ///
    /// Runs store operations inline, so call it off the async runtime.
    pub fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let message: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("Invalid JSON-RPC message: {e}");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ));
            }
        };

        let id = message.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id.unwrap_or(Value::Null),
                    INVALID_REQUEST,
                    format!("Invalid request: {e}"),
                ));
            }
        };

        if request.jsonrpc.as_deref().is_some_and(|v| v != JSONRPC_VERSION) {
            return Some(JsonRpcResponse::error(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        let Some(id) = id else {
            debug!(method = %request.method, "ignoring notification");
            return None;
        };

        debug!(method = %request.method, "handling request");
        Some(match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, Self::initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(id, request.params),
            other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        })
    }

    fn initialize_result() -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}"));
            }
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        match call_tool(&self.store, &params.name, params.arguments) {
            Ok(output) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [{ "type": "text", "text": output.text }],
                    "isError": output.is_error
                }),
            ),
            Err(e) => JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
        }
    }

    /// Serve requests from stdin until it closes.
    pub async fn run_stdio(self) -> Result<()> {
        info!("MCP stdio transport ready - listening on stdin/stdout");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            if line.trim().is_empty() {
                continue;
            }

            let server = self.clone();
            let response = tokio::task::spawn_blocking(move || server.handle_message(&line))
                .await
                .context("request task failed")?;

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }
}
