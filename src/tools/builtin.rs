use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::ToolError;

use super::handler::{decode_args, CallBudget, ToolDescriptor, ToolHandler};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// --- ping ---

pub struct Ping;

#[derive(Deserialize)]
struct PingArgs {
    #[serde(default = "default_msg")]
    msg: String,
}

fn default_msg() -> String {
    "ok".into()
}

impl Ping {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "ping",
            "Quick connectivity check.",
            json!({
                "type": "object",
                "properties": {"msg": {"type": "string", "default": "ok"}},
                "required": []
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(3), "Timed out pinging.")
    }
}

#[async_trait]
impl ToolHandler for Ping {
    async fn call(&self, _ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let args: PingArgs = decode_args(args)?;
        Ok(format!("pong: {}", args.msg))
    }
}

// --- get_current_time ---

pub struct CurrentTime;

#[derive(Deserialize)]
struct TimeArgs {
    #[serde(default)]
    timezone: Option<String>,
}

impl CurrentTime {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "get_current_time",
            "Get the current time in a specified timezone.",
            json!({
                "type": "object",
                "properties": {
                    "timezone": {
                        "type": "string",
                        "description": "IANA timezone (e.g., 'UTC', 'Europe/Rome', 'America/New_York')",
                        "default": "UTC"
                    }
                },
                "required": []
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(5), "Timed out getting current time.")
    }
}

#[async_trait]
impl ToolHandler for CurrentTime {
    async fn call(&self, _ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let args: TimeArgs = decode_args(args)?;
        Ok(describe_time(args.timezone.as_deref(), Utc::now()))
    }
}

/// Render `now` in the named zone. Empty or `UTC` stays in UTC; an unknown
/// zone falls back to UTC with a note.
pub fn describe_time(timezone: Option<&str>, now: DateTime<Utc>) -> String {
    let tz_name = timezone.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("UTC");

    if tz_name.eq_ignore_ascii_case("UTC") {
        return format!("Current time in {tz_name}: {} UTC", now.format(TIME_FORMAT));
    }

    match tz_name.parse::<Tz>() {
        Ok(tz) => {
            let local = now.with_timezone(&tz);
            format!(
                "Current time in {tz_name}: {} (UTC{})",
                local.format(TIME_FORMAT),
                local.format("%:z")
            )
        }
        Err(_) => format!(
            "Current time (UTC): {} UTC. Note: Unknown timezone '{tz_name}', falling back to UTC.",
            now.format(TIME_FORMAT)
        ),
    }
}
