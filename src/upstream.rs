use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::HttpTimeouts;
use crate::error::UpstreamError;

/// Stateless outbound HTTP client for the data providers behind the tools.
///
/// Connect and read phases get their own budgets from [`HttpTimeouts`];
/// each request is additionally capped at the sum of all phases so the
/// socket is always released eventually, even after the caller stops waiting.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    user_agent: String,
    request_timeout: std::time::Duration,
}

impl UpstreamClient {
    pub fn new(user_agent: impl Into<String>, timeouts: &HttpTimeouts) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .pool_idle_timeout(timeouts.pool_idle)
            .build()
            .map_err(|e| UpstreamError::Transport(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
            request_timeout: timeouts.total(),
        })
    }

    /// POST a url-encoded form and parse the JSON body.
    pub async fn post_form<F>(&self, url: &str, form: &F) -> Result<Value, UpstreamError>
    where
        F: Serialize + ?Sized,
    {
        debug!(url, "upstream POST");
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.request_timeout)
            .form(form)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    /// GET with query parameters and parse the JSON body.
    pub async fn get_json<Q>(&self, url: &str, query: &Q) -> Result<Value, UpstreamError>
    where
        Q: Serialize + ?Sized,
    {
        debug!(url, "upstream GET");
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .query(query)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value, UpstreamError> {
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}
