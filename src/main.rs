use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tool_server::config::{ServerConfig, ToolSet, DEFAULT_USER_AGENT};
use tool_server::model::ModelSlot;
use tool_server::server::{serve, AppState};
use tool_server::translate::HttpTranslatorLoader;

#[derive(Parser, Debug)]
#[command(name = "tool-server", version, about = "Tool-invocation server over JSON-RPC and SSE")]
struct Args {
    /// Bind address.
    #[arg(long, env = "TOOL_SERVER_BIND", default_value = "0.0.0.0:8001")]
    bind: String,

    /// Which tools to register.
    #[arg(long, env = "TOOL_SERVER_TOOLSET", value_enum, default_value = "joint")]
    tool_set: ToolSet,

    /// Service name reported by initialize, /health and /info.
    #[arg(long, env = "TOOL_SERVER_NAME")]
    service_name: Option<String>,

    /// Overpass mirror URL. Repeat, or pass a comma-separated list.
    #[arg(long = "overpass-endpoint", env = "OVERPASS_ENDPOINTS", value_delimiter = ',')]
    overpass_endpoints: Vec<String>,

    /// User-Agent sent to every upstream.
    #[arg(long, env = "TOOL_SERVER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Allowed CORS origin. Repeatable; none means any origin.
    #[arg(long = "allowed-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Base URL of the translation backend.
    #[arg(long, env = "TRANSLATOR_URL")]
    translator_url: Option<String>,

    /// TripAdvisor Content API key.
    #[arg(long, env = "TRIPADVISOR_API_KEY", hide_env_values = true)]
    tripadvisor_api_key: Option<String>,

    /// Public URL advertised in /openapi.json.
    #[arg(long, env = "TOOL_SERVER_PUBLIC_URL")]
    public_url: Option<String>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::for_tool_set(self.tool_set);
        if let Some(name) = self.service_name {
            config.service_name = name;
        }
        if !self.overpass_endpoints.is_empty() {
            config.overpass_endpoints = self.overpass_endpoints;
        }
        config.user_agent = self.user_agent;
        config.allowed_origins = self.allowed_origins;
        config.translator_url = self.translator_url;
        config.tripadvisor_api_key = self.tripadvisor_api_key;
        config.public_url = self
            .public_url
            .unwrap_or_else(|| format!("http://{}", self.bind));
        config
    }
}

/// Log directives used when `RUST_LOG` is unset.
fn default_directives(debug: bool) -> &'static str {
    if debug {
        "tool_server=debug"
    } else {
        "tool_server=info"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(args.debug)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bind = args.bind.clone();
    let config = args.into_config();
    let tool_set = config.tool_set;

    let model = if tool_set.needs_model() {
        Arc::new(ModelSlot::new())
    } else {
        Arc::new(ModelSlot::disabled(format!(
            "tool set '{}' has no translation model",
            tool_set.service_name()
        )))
    };
    let loader = HttpTranslatorLoader::new(config.translator_url.clone(), config.model_name.clone());

    let state = Arc::new(AppState::from_config(config, model.clone()).context("build server state")?);

    if tool_set.needs_model() {
        tokio::spawn(async move { model.load(&loader).await });
    }

    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
        }
    });

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    serve(listener, state).await.context("serve")
}
