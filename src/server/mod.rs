//! HTTP front-end: JSON-RPC on `/`, streamed sessions on `/sse` + `/message`,
//! and the metadata endpoints.

pub mod jsonrpc;
pub mod meta;
pub mod sse;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::context::{ContextError, ToolContext};
use crate::error::RegistryError;
use crate::model::ModelSlot;
use crate::tools::{build_registry, Dispatcher};

pub use sse::Sessions;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub sessions: Sessions,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            sessions: Sessions::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Wire config, model slot, registry and dispatcher together.
    pub fn from_config(config: ServerConfig, model: Arc<ModelSlot>) -> Result<Self, StartupError> {
        let registry = build_registry(config.tool_set)?;
        let ctx = ToolContext::new(config, model)?;
        Ok(Self::new(Dispatcher::new(Arc::new(registry), Arc::new(ctx))))
    }
}

/// Build the router with every route the server exposes.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.dispatcher.context().config.allowed_origins);
    Router::new()
        .route("/", get(meta::info).post(jsonrpc::rpc))
        .route("/info", get(meta::info))
        .route("/health", get(meta::health))
        .route("/openapi.json", get(meta::openapi))
        .route("/sse", get(sse::open))
        .route("/message", post(sse::message))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Serve until the state's shutdown token is cancelled. Open SSE streams end
/// on the same token.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let addr = listener.local_addr()?;
    info!(
        %addr,
        service = %state.dispatcher.context().config.service_name,
        tools = state.dispatcher.registry().len(),
        "tool server listening"
    );
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
