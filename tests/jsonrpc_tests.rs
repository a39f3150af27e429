use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tool_server::config::{ServerConfig, ToolSet};
use tool_server::model::ModelSlot;
use tool_server::server::{build_app, AppState};
use tool_server::translate::{TranslateError, Translator};

struct Echo;

#[async_trait]
impl Translator for Echo {
    async fn translate(&self, text: &str, _max_length: u32) -> Result<String, TranslateError> {
        Ok(format!("en({text})"))
    }
}

fn app_with(config: ServerConfig, model: ModelSlot) -> Router {
    let state = AppState::from_config(config, Arc::new(model)).unwrap();
    build_app(Arc::new(state))
}

fn joint_app() -> Router {
    app_with(ServerConfig::default(), ModelSlot::disabled("no backend"))
}

async fn post_raw(app: Router, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn rpc(app: Router, envelope: Value) -> Value {
    let (status, body) = post_raw(app, envelope.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn call_tool(app: Router, name: &str, arguments: Value) -> (String, bool) {
    let resp = rpc(
        app,
        json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"name": name, "arguments": arguments}}),
    )
    .await;
    let result = &resp["result"];
    (
        result["content"][0]["text"].as_str().unwrap().to_string(),
        result["isError"].as_bool().unwrap(),
    )
}

#[tokio::test]
async fn initialize_reports_server_info() {
    let resp = rpc(joint_app(), json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})).await;
    assert_eq!(resp["jsonrpc"], "2.0");
    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"]["protocolVersion"], "2025-06-18");
    assert_eq!(resp["result"]["serverInfo"]["name"], "translator-and-osm");
    assert!(resp["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn tools_list_is_stable_across_calls() {
    let app = joint_app();
    let first = rpc(app.clone(), json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
    let second = rpc(app, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    assert_eq!(first["result"], second["result"]);

    let tools = first["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "get_current_time",
            "search_osm_restaurants",
            "get_osm_place_details",
            "translate_ja_to_en",
            "ping",
        ]
    );
    for tool in tools {
        assert!(tool["description"].is_string());
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[tokio::test]
async fn ping_tool_echoes_message() {
    let (text, is_error) = call_tool(joint_app(), "ping", json!({"msg": "hi"})).await;
    assert_eq!(text, "pong: hi");
    assert!(!is_error);
}

#[tokio::test]
async fn ping_tool_defaults_message() {
    let (text, _) = call_tool(joint_app(), "ping", json!({})).await;
    assert_eq!(text, "pong: ok");
}

#[tokio::test]
async fn current_time_in_utc() {
    let (text, is_error) = call_tool(joint_app(), "get_current_time", json!({"timezone": "utc"})).await;
    assert!(!is_error);
    assert!(text.starts_with("Current time in utc: "), "{text}");
    assert!(text.ends_with(" UTC"), "{text}");
}

#[tokio::test]
async fn current_time_unknown_zone_falls_back() {
    let (text, _) = call_tool(joint_app(), "get_current_time", json!({"timezone": "Mars/Olympus"})).await;
    assert!(text.starts_with("Current time (UTC): "), "{text}");
    assert!(text.ends_with("Note: Unknown timezone 'Mars/Olympus', falling back to UTC."), "{text}");
}

#[tokio::test]
async fn unknown_tool_is_reported_in_result() {
    let (text, is_error) = call_tool(joint_app(), "nope", json!({})).await;
    assert_eq!(text, "Unknown tool: nope");
    assert!(is_error);
}

#[tokio::test]
async fn bad_arguments_are_wrapped_not_raised() {
    let (text, is_error) = call_tool(joint_app(), "search_osm_restaurants", json!({"latitude": "north"})).await;
    assert!(is_error);
    assert!(text.starts_with("Unhandled error in tool 'search_osm_restaurants': "), "{text}");
}

#[tokio::test]
async fn translation_without_model_reports_not_ready() {
    let (text, is_error) = call_tool(joint_app(), "translate_ja_to_en", json!({"text": "こんにちは"})).await;
    assert!(is_error);
    assert_eq!(text, "[translation-error] model not ready: no backend");
}

#[tokio::test]
async fn translation_with_ready_model() {
    let app = app_with(ServerConfig::default(), ModelSlot::ready(Arc::new(Echo)));
    let (text, is_error) = call_tool(app, "translate_ja_to_en", json!({"text": "こんにちは"})).await;
    assert!(!is_error);
    assert_eq!(text, "en(こんにちは)");
}

#[tokio::test]
async fn tripadvisor_without_key_asks_for_it() {
    let app = app_with(ServerConfig::for_tool_set(ToolSet::Tripadvisor), ModelSlot::disabled("unused"));
    let (text, is_error) = call_tool(app, "get_restaurant_details", json!({"location_id": "123"})).await;
    assert!(is_error);
    assert!(text.starts_with("TripAdvisor API key missing."), "{text}");
    assert!(text.contains("TRIPADVISOR_API_KEY"));
}

#[tokio::test]
async fn missing_tool_name_is_invalid_params() {
    let resp = rpc(joint_app(), json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {}})).await;
    assert_eq!(resp["error"]["code"], -32602);
    assert_eq!(resp["id"], 3);
    assert!(resp.get("result").is_none());
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let (status, body) = post_raw(joint_app(), "{not json").await;
    assert_eq!(status, StatusCode::OK);
    let resp: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(resp["error"]["code"], -32700);
    assert_eq!(resp["id"], Value::Null);
}

#[tokio::test]
async fn envelope_without_method_is_parse_error() {
    let resp = rpc(joint_app(), json!({"jsonrpc": "2.0", "id": 4})).await;
    assert_eq!(resp["error"]["code"], -32700);
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let resp = rpc(joint_app(), json!({"jsonrpc": "2.0", "id": "x", "method": "resources/list"})).await;
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["id"], "x");
}

#[tokio::test]
async fn protocol_ping_returns_empty_object() {
    let resp = rpc(joint_app(), json!({"jsonrpc": "2.0", "id": 5, "method": "ping"})).await;
    assert_eq!(resp["result"], json!({}));
}

#[tokio::test]
async fn notifications_get_no_body() {
    let (status, body) = post_raw(
        joint_app(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_empty());
}

#[tokio::test]
async fn health_is_degraded_without_model() {
    let (status, body) = get_json(joint_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["service"], "translator-and-osm");
    assert_eq!(body["model_ready"], false);
    assert_eq!(body["model_error"], "no backend");
}

#[tokio::test]
async fn health_is_healthy_with_model() {
    let app = app_with(ServerConfig::default(), ModelSlot::ready(Arc::new(Echo)));
    let (_, body) = get_json(app, "/health").await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_ready"], true);
    assert_eq!(body["model_error"], Value::Null);
}

#[tokio::test]
async fn health_while_model_is_loading() {
    let app = app_with(ServerConfig::default(), ModelSlot::new());
    let (_, body) = get_json(app, "/health").await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["model_ready"], false);
    assert_eq!(body["model_error"], Value::Null);
}

#[tokio::test]
async fn health_without_model_requirement() {
    let app = app_with(ServerConfig::for_tool_set(ToolSet::Osm), ModelSlot::disabled("unused"));
    let (_, body) = get_json(app, "/health").await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "time-and-osm");
    assert!(body.get("model_ready").is_none());
}

#[tokio::test]
async fn info_and_root_agree() {
    let app = joint_app();
    let (_, info) = get_json(app.clone(), "/info").await;
    let (_, root) = get_json(app, "/").await;
    assert_eq!(info, root);
    assert_eq!(info["service"], "translator-and-osm");
    assert_eq!(info["tools"].as_array().unwrap().len(), 5);
    assert_eq!(info["model"]["ready"], false);
}

#[tokio::test]
async fn openapi_lists_routes() {
    let (status, doc) = get_json(joint_app(), "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["openapi"].as_str().unwrap().starts_with("3."));
    for path in ["/", "/health", "/info", "/sse", "/message"] {
        assert!(doc["paths"].get(path).is_some(), "{path}");
    }
}
