//! MCP stdio server: JSON-RPC lines on stdin, responses on stdout.
//!
//! Logs go to stderr so stdout carries protocol traffic only.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::mcp::protocol::*;
use crate::tools::Dispatcher;
use crate::types::{CallId, Result, ToolCallRequest};

/// MCP adapter over the dispatcher.
#[derive(Debug, Clone)]
pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serve stdin/stdout until EOF or cancellation.
    pub async fn run_stdio(&self, cancel: CancellationToken) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.run(reader, writer, cancel).await
    }

    /// Serve any line-oriented reader/writer pair.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W, cancel: CancellationToken) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            let n = tokio::select! {
                _ = cancel.cancelled() => break,
                n = reader.read_line(&mut line) => n?,
            };
            if n == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(trimmed).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        tracing::info!("mcp session ended");
        Ok(())
    }

    /// Handle one JSON-RPC message. Notifications yield no response.
    pub async fn handle_message(&self, msg: &str) -> Option<JsonRpcResponse> {
        let req: JsonRpcRequest = match serde_json::from_str(msg) {
            Ok(r) => r,
            Err(e) => return Some(JsonRpcResponse::error(None, PARSE_ERROR, format!("parse error: {e}"))),
        };
        if req.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(req.id, INVALID_REQUEST, "jsonrpc must be \"2.0\""));
        }

        let id = req.id.clone();
        let response = match req.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, to_value(InitializeResult::current())),
            "initialized" | "notifications/initialized" => {
                if id.is_none() {
                    return None;
                }
                JsonRpcResponse::success(id, serde_json::json!({}))
            }
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => {
                let tools: Vec<McpTool> = self
                    .dispatcher
                    .list_tools()
                    .into_iter()
                    .map(McpTool::from)
                    .collect();
                JsonRpcResponse::success(id, serde_json::json!({ "tools": tools }))
            }
            "tools/call" => self.handle_tools_call(id, &req.params).await,
            _ if id.is_none() => return None,
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("method not found: {}", req.method)),
        };
        Some(response)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: &Value) -> JsonRpcResponse {
        let name = match params.get("name").and_then(Value::as_str) {
            Some(n) => n.to_string(),
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "missing tool name"),
        };
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return JsonRpcResponse::error(id, INVALID_PARAMS, "arguments must be an object"),
        };

        let call_id = match &id {
            Some(Value::String(s)) => CallId::from(s.as_str()),
            Some(other) => CallId::from(other.to_string()),
            None => CallId::generate(),
        };

        let result = self
            .dispatcher
            .dispatch(ToolCallRequest::new(call_id, name, arguments))
            .await;
        JsonRpcResponse::success(id, to_value(McpToolResult::from(&result)))
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
