use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::context::ToolContext;
use crate::error::ToolError;

use super::handler::ToolDescriptor;
use super::registry::ToolRegistry;

const PREVIEW_CHARS: usize = 200;

/// Outcome of exactly one tool call. Both sides carry user-readable text.
pub type ToolCallResult = Result<String, String>;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Routes calls to handlers and normalizes every outcome into a
/// [`ToolCallResult`]. Nothing a handler does escapes as anything but text.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    ctx: Arc<ToolContext>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, ctx: Arc<ToolContext>) -> Self {
        Self { registry, ctx }
    }

    pub fn catalogue(&self) -> Vec<ToolDescriptor> {
        self.registry.list()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    pub async fn call(&self, request: ToolCallRequest) -> ToolCallResult {
        let ToolCallRequest { name, arguments } = request;
        info!(tool = %name, args = %preview(&arguments.to_string()), "tool call");

        let started = Instant::now();
        let result = self.run(&name, arguments).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(text) => info!(tool = %name, elapsed_ms, result = %preview(text), "tool call succeeded"),
            Err(text) => warn!(tool = %name, elapsed_ms, result = %preview(text), "tool call failed"),
        }
        result
    }

    async fn run(&self, name: &str, arguments: Value) -> ToolCallResult {
        let entry = self.registry.resolve(name).map_err(|e| e.to_string())?;

        // The handler runs as its own task so a panic surfaces as a JoinError
        // and a timeout can abort it without touching the caller.
        let handler = entry.handler.clone();
        let ctx = self.ctx.clone();
        let mut task = tokio::spawn(async move { handler.call(&ctx, &arguments).await });

        match tokio::time::timeout(entry.budget.limit, &mut task).await {
            Ok(Ok(Ok(text))) => Ok(text),
            Ok(Ok(Err(e))) => Err(render_error(name, &e)),
            Ok(Err(join)) => Err(unhandled(name, &describe_join_error(join))),
            Err(_) => {
                task.abort();
                Err(entry.budget.on_timeout.clone())
            }
        }
    }
}

fn render_error(name: &str, err: &ToolError) -> String {
    if err.is_user_facing() {
        err.to_string()
    } else {
        unhandled(name, &err.to_string())
    }
}

fn unhandled(name: &str, detail: &str) -> String {
    format!("Unhandled error in tool '{name}': {detail}")
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            format!("handler panicked: {s}")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("handler panicked: {s}")
        } else {
            "handler panicked".into()
        }
    } else {
        "handler was cancelled".into()
    }
}

/// Truncate on a char boundary for log output.
pub(crate) fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::model::ModelSlot;
    use crate::tools::handler::{CallBudget, ToolHandler};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(&self, _ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
            Ok(args.to_string())
        }
    }

    struct FailingTool(fn() -> ToolError);

    #[async_trait]
    impl ToolHandler for FailingTool {
        async fn call(&self, _ctx: &ToolContext, _args: &Value) -> Result<String, ToolError> {
            Err((self.0)())
        }
    }

    struct HangingTool;

    #[async_trait]
    impl ToolHandler for HangingTool {
        async fn call(&self, _ctx: &ToolContext, _args: &Value) -> Result<String, ToolError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl ToolHandler for PanickingTool {
        async fn call(&self, _ctx: &ToolContext, _args: &Value) -> Result<String, ToolError> {
            panic!("boom");
        }
    }

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, name, json!({"type": "object", "properties": {}, "required": []}))
    }

    fn dispatcher() -> Dispatcher {
        let mut reg = ToolRegistry::new();
        let fast = || CallBudget::new(Duration::from_secs(3), "Timed out pinging.");
        reg.register(descriptor("echo"), fast(), EchoTool).unwrap();
        reg.register(
            descriptor("bad_args"),
            fast(),
            FailingTool(|| ToolError::InvalidArguments("missing field `text`".into())),
        )
        .unwrap();
        reg.register(
            descriptor("phrased"),
            fast(),
            FailingTool(|| ToolError::Reported("Overpass error 503.".into())),
        )
        .unwrap();
        reg.register(
            descriptor("hang"),
            CallBudget::new(Duration::from_secs(5), "Timed out getting current time."),
            HangingTool,
        )
        .unwrap();
        reg.register(descriptor("panic"), fast(), PanickingTool).unwrap();

        let ctx = ToolContext::new(ServerConfig::default(), Arc::new(ModelSlot::new())).unwrap();
        Dispatcher::new(Arc::new(reg), Arc::new(ctx))
    }

    #[tokio::test]
    async fn success_passes_text_through() {
        let out = dispatcher()
            .call(ToolCallRequest::new("echo", json!({"a": 1})))
            .await;
        assert_eq!(out, Ok(r#"{"a":1}"#.to_string()));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let out = dispatcher().call(ToolCallRequest::new("nope", json!({}))).await;
        assert_eq!(out, Err("Unknown tool: nope".to_string()));
    }

    #[tokio::test]
    async fn generic_failures_are_wrapped() {
        let out = dispatcher().call(ToolCallRequest::new("bad_args", json!({}))).await;
        assert_eq!(
            out,
            Err("Unhandled error in tool 'bad_args': invalid arguments: missing field `text`".to_string())
        );
    }

    #[tokio::test]
    async fn phrased_failures_pass_through() {
        let out = dispatcher().call(ToolCallRequest::new("phrased", json!({}))).await;
        assert_eq!(out, Err("Overpass error 503.".to_string()));
    }

    #[tokio::test]
    async fn panics_become_unhandled_errors() {
        let out = dispatcher().call(ToolCallRequest::new("panic", json!({}))).await;
        let msg = out.unwrap_err();
        assert!(msg.starts_with("Unhandled error in tool 'panic': handler panicked"));
        assert!(msg.contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_handler_times_out_within_budget() {
        let d = dispatcher();
        let start = tokio::time::Instant::now();
        let out = d.call(ToolCallRequest::new("hang", json!({}))).await;
        assert_eq!(out, Err("Timed out getting current time.".to_string()));

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_millis(5_050));
    }

    #[tokio::test]
    async fn concurrent_calls_are_independent() {
        let d = dispatcher();
        let calls = (0..16).map(|i| {
            let d = d.clone();
            async move { d.call(ToolCallRequest::new("echo", json!({"i": i}))).await }
        });
        let results = futures::future::join_all(calls).await;
        for (i, r) in results.into_iter().enumerate() {
            assert_eq!(r, Ok(format!(r#"{{"i":{i}}}"#)));
        }
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 1);
        assert!(p.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
