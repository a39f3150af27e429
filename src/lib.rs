//! Tool-invocation server: a JSON-RPC/SSE front-end over a fixed registry of
//! tools that call external data sources through mirror failover.

pub mod config;
pub mod context;
pub mod error;
pub mod mirror;
pub mod model;
pub mod server;
pub mod tools;
pub mod translate;
pub mod upstream;

pub use config::{HttpTimeouts, RetryPolicy, ServerConfig, ToolSet};
pub use context::{ContextError, ToolContext};
pub use error::{ConfigError, RegistryError, ToolError, UpstreamError};
pub use mirror::{EndpointPool, MirrorFailover};
pub use model::{ModelSlot, ModelState};
pub use server::{build_app, serve, AppState, StartupError};
pub use tools::{
    build_registry, Dispatcher, ToolCallRequest, ToolCallResult, ToolDescriptor, ToolHandler,
    ToolRegistry,
};
pub use translate::{HttpTranslator, HttpTranslatorLoader, TranslateError, Translator, TranslatorLoader};
pub use upstream::UpstreamClient;
