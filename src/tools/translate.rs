use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::context::ToolContext;
use crate::error::ToolError;

use super::handler::{decode_args, CallBudget, ToolDescriptor, ToolHandler};

pub struct TranslateJaToEn;

#[derive(Deserialize)]
struct TranslateArgs {
    text: String,
    #[serde(default = "default_max_length")]
    max_length: u32,
}

fn default_max_length() -> u32 {
    512
}

impl TranslateJaToEn {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "translate_ja_to_en",
            "Translate Japanese to English.",
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "Japanese text"},
                    "max_length": {"type": "integer", "description": "Maximum length of translation", "default": 512}
                },
                "required": ["text"]
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(60), "Timed out translating text.")
    }
}

#[async_trait]
impl ToolHandler for TranslateJaToEn {
    async fn call(&self, ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let translator = ctx.model.translator()?;
        let args: TranslateArgs = decode_args(args)?;

        debug!(chars = args.text.chars().count(), "translating");
        translator
            .translate(&args.text, args.max_length)
            .await
            .map_err(|e| ToolError::Internal(e.to_string()))
    }
}
