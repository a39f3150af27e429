//! Endpoint-pool failover for upstreams that offer several equivalent mirrors.
//!
//! One call shuffles the pool once, then makes up to `rounds` passes over it.
//! Within a pass a failure moves straight on to the next mirror; only an
//! exhausted pass sleeps, with exponential backoff, before the next one.

use std::future::Future;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{ConfigError, UpstreamError};

/// Ordered, non-empty set of interchangeable upstream URLs.
#[derive(Debug, Clone)]
pub struct EndpointPool {
    endpoints: Vec<String>,
}

impl EndpointPool {
    pub fn new<I, S>(endpoints: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints: Vec<String> = endpoints
            .into_iter()
            .map(Into::into)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if endpoints.is_empty() {
            return Err(ConfigError::EmptyEndpointPool);
        }
        for url in &endpoints {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidEndpoint {
                    url: url.clone(),
                    reason: "expected an http:// or https:// URL".into(),
                });
            }
        }
        Ok(Self { endpoints })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

/// Reusable retry/rotation executor. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct MirrorFailover {
    policy: RetryPolicy,
}

impl MirrorFailover {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `attempt` against the pool until one endpoint succeeds.
    ///
    /// `attempt` receives the endpoint URL and builds the whole request, so the
    /// executor knows nothing about payloads. Every error counts as a failed
    /// attempt; the last one is reported inside [`UpstreamError::Exhausted`].
    pub async fn execute<T, F, Fut>(
        &self,
        pool: &EndpointPool,
        mut attempt: F,
    ) -> Result<T, UpstreamError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut order = pool.endpoints.clone();
        if self.policy.shuffle {
            order.shuffle(&mut rand::thread_rng());
        }

        let rounds = self.policy.rounds.max(1);
        let mut last_error = UpstreamError::Transport("no attempt was made".into());

        for round in 1..=rounds {
            for endpoint in &order {
                match attempt(endpoint.clone()).await {
                    Ok(value) => {
                        if round > 1 {
                            debug!(endpoint = %endpoint, round, "mirror recovered");
                        }
                        return Ok(value);
                    }
                    Err(e) => {
                        debug!(endpoint = %endpoint, round, error = %e, "mirror attempt failed");
                        last_error = e;
                    }
                }
            }

            if round < rounds {
                let delay = self.policy.backoff(round);
                warn!(
                    round,
                    rounds,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "all mirrors failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }

        warn!(rounds, error = %last_error, "mirror pool exhausted");
        Err(UpstreamError::Exhausted {
            rounds,
            last_error: Box::new(last_error),
        })
    }
}
