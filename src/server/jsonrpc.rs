use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::tools::{Dispatcher, ToolCallRequest, ToolCallResult};

use super::AppState;

pub const PROTOCOL_VERSION: &str = "2025-06-18";
pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// What the transport should send back for one inbound envelope.
#[derive(Debug)]
pub enum Reply {
    Response(RpcResponse),
    /// Notifications get no response body.
    Accepted,
}

/// Wrap a dispatcher outcome as MCP `CallToolResult` content.
pub fn call_result(result: ToolCallResult) -> Value {
    let (text, is_error) = match result {
        Ok(text) => (text, false),
        Err(text) => (text, true),
    };
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error,
    })
}

/// Parse and answer one JSON-RPC envelope. Shared by both transports.
pub async fn handle_message(dispatcher: &Dispatcher, body: &[u8]) -> Reply {
    let req: RpcRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            debug!(error = %e, "unparsable JSON-RPC envelope");
            return Reply::Response(RpcResponse::failure(Value::Null, PARSE_ERROR, "Parse error"));
        }
    };

    if req.method.starts_with("notifications/") {
        debug!(method = %req.method, "notification received");
        return Reply::Accepted;
    }

    let id = req.id.unwrap_or(Value::Null);
    let response = match req.method.as_str() {
        "initialize" => RpcResponse::success(id, initialize_result(dispatcher)),
        "ping" => RpcResponse::success(id, json!({})),
        "tools/list" => RpcResponse::success(id, json!({ "tools": dispatcher.catalogue() })),
        "tools/call" => {
            let params = req.params.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolCallRequest>(params) {
                Ok(call) => RpcResponse::success(id, call_result(dispatcher.call(call).await)),
                Err(e) => RpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {e}")),
            }
        }
        other => RpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    };
    Reply::Response(response)
}

fn initialize_result(dispatcher: &Dispatcher) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": dispatcher.context().config.service_name,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// `POST /`. Always HTTP 200 for envelopes so clients can read the error.
pub async fn rpc(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match handle_message(&state.dispatcher, &body).await {
        Reply::Response(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Reply::Accepted => StatusCode::ACCEPTED.into_response(),
    }
}
