use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TranslateError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("translation failed: {0}")]
    Failed(String),
}

/// Opaque machine-translation capability. Japanese in, English out.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, max_length: u32) -> Result<String, TranslateError>;
}

/// Produces the translator once, at startup.
#[async_trait]
pub trait TranslatorLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Translator>, TranslateError>;
}

/// Translator backed by an inference service speaking a small JSON protocol:
/// `POST {base}/translate` with `{text, source_lang, target_lang, max_length}`
/// returning `{translation}`.
pub struct HttpTranslator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    model: &'a str,
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
    max_length: u32,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translation: String,
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, max_length: u32) -> Result<String, TranslateError> {
        let body = TranslateRequest {
            model: &self.model,
            text,
            source_lang: "ja_XX",
            target_lang: "en_XX",
            max_length,
        };
        debug!(chars = text.chars().count(), max_length, "translation request");

        let resp = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::Failed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Failed(format!("backend returned {status}: {body}")));
        }

        let parsed: TranslateResponse = resp
            .json()
            .await
            .map_err(|e| TranslateError::Failed(format!("failed to parse response: {e}")))?;
        Ok(parsed.translation)
    }
}

/// Loads an [`HttpTranslator`] by probing the backend's health route once.
pub struct HttpTranslatorLoader {
    client: reqwest::Client,
    base_url: Option<String>,
    model: String,
}

impl HttpTranslatorLoader {
    pub fn new(base_url: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            model: model.into(),
        }
    }
}

#[async_trait]
impl TranslatorLoader for HttpTranslatorLoader {
    async fn load(&self) -> Result<Arc<dyn Translator>, TranslateError> {
        let base_url = self.base_url.clone().ok_or_else(|| {
            TranslateError::ModelUnavailable(
                "no translation backend configured (set TRANSLATOR_URL)".into(),
            )
        })?;

        let resp = self
            .client
            .get(format!("{base_url}/health"))
            .send()
            .await
            .map_err(|e| TranslateError::ModelUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TranslateError::ModelUnavailable(format!(
                "backend health check returned {}",
                resp.status()
            )));
        }

        Ok(Arc::new(HttpTranslator {
            client: self.client.clone(),
            base_url,
            model: self.model.clone(),
        }))
    }
}
