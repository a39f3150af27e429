use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::{ConfigError, UpstreamError};
use crate::mirror::{EndpointPool, MirrorFailover};
use crate::model::ModelSlot;
use crate::upstream::UpstreamClient;

/// Process-wide dependencies handed to every tool handler.
///
/// Built once at startup and shared read-only; nothing here is mutated after
/// the server starts accepting calls except the one-shot [`ModelSlot`].
pub struct ToolContext {
    pub config: ServerConfig,
    pub http: UpstreamClient,
    pub failover: MirrorFailover,
    pub overpass: EndpointPool,
    pub model: Arc<ModelSlot>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ToolContext {
    pub fn new(config: ServerConfig, model: Arc<ModelSlot>) -> Result<Self, ContextError> {
        let http = UpstreamClient::new(config.user_agent.clone(), &config.timeouts)?;
        let overpass = EndpointPool::new(config.overpass_endpoints.clone())?;
        let failover = MirrorFailover::new(config.retry.clone());
        Ok(Self {
            config,
            http,
            failover,
            overpass,
            model,
        })
    }

    pub fn tripadvisor_key(&self) -> Option<&str> {
        self.config
            .tripadvisor_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }
}
