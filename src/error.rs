/// Failures from the outbound HTTP layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("upstream returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("all mirrors failed after {rounds} rounds. Last error: {last_error}")]
    Exhausted { rounds: u32, last_error: Box<UpstreamError> },
}

impl UpstreamError {
    /// The HTTP status behind this failure, looking through exhaustion.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            UpstreamError::Exhausted { last_error, .. } => last_error.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout(e.to_string())
        } else if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// Everything a tool call can fail with. The dispatcher turns each of these
/// into a single line of text for the caller.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),
    #[error("{0}")]
    UpstreamExhausted(String),
    #[error("upstream HTTP error {status}: {body}")]
    UpstreamHttp { status: u16, body: String },
    #[error("{0}")]
    ResourceNotReady(String),
    #[error("{0}")]
    ConfigurationMissing(String),
    /// A message the handler already phrased for the user.
    #[error("{0}")]
    Reported(String),
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    /// Whether the message is fit to show as-is, without the generic
    /// "Unhandled error" wrapper.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ToolError::UnknownTool(_)
                | ToolError::Reported(_)
                | ToolError::ResourceNotReady(_)
                | ToolError::ConfigurationMissing(_)
        )
    }
}

impl From<UpstreamError> for ToolError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Timeout(msg) => ToolError::UpstreamTimeout(msg),
            UpstreamError::Http { status, body } => ToolError::UpstreamHttp { status, body },
            exhausted @ UpstreamError::Exhausted { .. } => {
                ToolError::UpstreamExhausted(exhausted.to_string())
            }
            other => ToolError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("endpoint pool must contain at least one URL")]
    EmptyEndpointPool,
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}
