use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::error::ToolError;
use crate::translate::{Translator, TranslatorLoader};

/// Readiness snapshot reported by `/health` and consulted by handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelState {
    pub ready: bool,
    pub error: Option<String>,
}

/// Holds the process-wide translation model.
///
/// Empty until the single load attempt finishes, then fixed for the life of
/// the process. The outcome is published in one step, so readers either see
/// "not ready" or the finished result.
#[derive(Default)]
pub struct ModelSlot {
    outcome: OnceCell<Result<Arc<dyn Translator>, String>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that was never meant to hold a model.
    pub fn disabled(reason: impl Into<String>) -> Self {
        let slot = Self::new();
        let _ = slot.outcome.set(Err(reason.into()));
        slot
    }

    /// A slot with an already-loaded translator.
    pub fn ready(translator: Arc<dyn Translator>) -> Self {
        let slot = Self::new();
        let _ = slot.outcome.set(Ok(translator));
        slot
    }

    /// Run the loader once. Later calls are no-ops. Never fails outward.
    pub async fn load(&self, loader: &dyn TranslatorLoader) {
        self.outcome
            .get_or_init(|| async {
                info!("loading translation model");
                match loader.load().await {
                    Ok(translator) => {
                        info!("translation model loaded");
                        Ok(translator)
                    }
                    Err(e) => {
                        error!(error = %e, "translation model failed to load");
                        Err(e.to_string())
                    }
                }
            })
            .await;
    }

    pub fn state(&self) -> ModelState {
        match self.outcome.get() {
            None => ModelState { ready: false, error: None },
            Some(Ok(_)) => ModelState { ready: true, error: None },
            Some(Err(e)) => ModelState { ready: false, error: Some(e.clone()) },
        }
    }

    /// The loaded translator, or `ResourceNotReady` with the load error.
    pub fn translator(&self) -> Result<Arc<dyn Translator>, ToolError> {
        match self.outcome.get() {
            Some(Ok(t)) => Ok(t.clone()),
            Some(Err(e)) => Err(not_ready(e)),
            None => Err(not_ready("still loading")),
        }
    }
}

fn not_ready(detail: &str) -> ToolError {
    ToolError::ResourceNotReady(format!("[translation-error] model not ready: {detail}"))
}
