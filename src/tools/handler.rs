use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::ToolError;

/// A tool's execution handler. Each tool implements this once.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &ToolContext, args: &Value) -> Result<String, ToolError>;
}

/// Wire-visible description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Names listed under `inputSchema.required`.
    pub fn required(&self) -> Vec<&str> {
        self.input_schema["required"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Wall-clock allowance for one call, and what to say when it runs out.
#[derive(Debug, Clone)]
pub struct CallBudget {
    pub limit: Duration,
    pub on_timeout: String,
}

impl CallBudget {
    pub fn new(limit: Duration, on_timeout: impl Into<String>) -> Self {
        Self {
            limit,
            on_timeout: on_timeout.into(),
        }
    }
}

/// Decode untyped call arguments into a tool's argument struct.
///
/// A missing or `null` argument object decodes like `{}` so that tools whose
/// fields all have defaults accept a bare call.
pub fn decode_args<T: DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args.clone()
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
