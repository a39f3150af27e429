use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Map, Value};

use super::jsonrpc::PROTOCOL_VERSION;
use super::AppState;

/// `/health` body. `degraded` only when this deployment needs the model and
/// it is not ready.
pub fn health_body(state: &AppState) -> Value {
    let ctx = state.dispatcher.context();
    let mut body = Map::new();

    let status = if ctx.config.tool_set.needs_model() {
        let model = ctx.model.state();
        let status = if model.ready { "healthy" } else { "degraded" };
        body.insert("model_ready".into(), Value::Bool(model.ready));
        body.insert("model_error".into(), json!(model.error));
        status
    } else {
        "healthy"
    };
    body.insert("status".into(), json!(status));
    body.insert("service".into(), json!(ctx.config.service_name));
    Value::Object(body)
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(health_body(&state))
}

pub fn info_body(state: &AppState) -> Value {
    let ctx = state.dispatcher.context();
    let mut body = json!({
        "service": ctx.config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "mcp",
        "protocolVersion": PROTOCOL_VERSION,
        "transports": ["http", "sse"],
        "endpoints": {
            "rpc": "/",
            "sse": "/sse",
            "message": "/message",
            "health": "/health",
            "info": "/info",
            "openapi": "/openapi.json",
        },
        "tools": state.dispatcher.registry().tool_names(),
    });
    if ctx.config.tool_set.needs_model() {
        let model = ctx.model.state();
        body["model"] = json!({
            "name": ctx.config.model_name,
            "ready": model.ready,
            "error": model.error,
        });
    }
    body
}

/// `GET /info` and `GET /`.
pub async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(info_body(&state))
}

pub fn openapi_body(state: &AppState) -> Value {
    let ctx = state.dispatcher.context();
    json!({
        "openapi": "3.1.0",
        "info": {
            "title": ctx.config.service_name,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{ "url": ctx.config.public_url }],
        "paths": {
            "/": {
                "get": { "summary": "Service info", "responses": { "200": { "description": "Service info" } } },
                "post": {
                    "summary": "JSON-RPC 2.0 endpoint (initialize, tools/list, tools/call, ping)",
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "type": "object" } } }
                    },
                    "responses": {
                        "200": { "description": "JSON-RPC response" },
                        "202": { "description": "Notification accepted" }
                    }
                }
            },
            "/health": {
                "get": { "summary": "Liveness and model readiness", "responses": { "200": { "description": "Health status" } } }
            },
            "/info": {
                "get": { "summary": "Service info", "responses": { "200": { "description": "Service info" } } }
            },
            "/sse": {
                "get": { "summary": "Open an event stream session", "responses": { "200": { "description": "text/event-stream" } } }
            },
            "/message": {
                "post": {
                    "summary": "Send a JSON-RPC envelope to an open session",
                    "parameters": [{
                        "name": "session_id",
                        "in": "query",
                        "required": true,
                        "schema": { "type": "string", "format": "uuid" }
                    }],
                    "responses": {
                        "202": { "description": "Accepted; reply is pushed on the stream" },
                        "404": { "description": "Unknown session" }
                    }
                }
            }
        },
        "x-tools": state.dispatcher.catalogue(),
    })
}

pub async fn openapi(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(openapi_body(&state))
}
