//! Shared HTTP transport for providers
//!
//! One pooled client with the pipeline's timeouts. Connection-level
//! failures are retried a bounded number of times with a fixed backoff;
//! upstream status codes are surfaced immediately so providers can
//! react to them (Shodan treats 404 as an answer, not a failure).

use std::time::Duration;

use serde_json::Value;
use tracing::warn;
use vigil_common::config::EnrichmentConfig;

use crate::error::{ProviderError, ProviderResult};

pub struct HttpClient {
    client: reqwest::Client,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl HttpClient {
    pub fn new(config: &EnrichmentConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("vigil-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            retry_attempts: config.retry_attempts.max(1),
            retry_backoff: config.retry_backoff,
        }
    }

    /// Builder access for providers that add their own headers.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a request and decode the JSON body. Transport failures are
    /// retried; a non-2xx status is returned as-is without retrying.
    pub async fn send_json(&self, request: reqwest::RequestBuilder) -> ProviderResult<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let req = request
                .try_clone()
                .ok_or_else(|| ProviderError::Malformed("request body is not replayable".into()))?;

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(ProviderError::Status(status.as_u16()));
                    }
                    return response
                        .json::<Value>()
                        .await
                        .map_err(|e| ProviderError::Malformed(e.to_string()));
                }
                Err(err) if attempt < self.retry_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.retry_attempts,
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(err) => return Err(ProviderError::Transport(err)),
            }
        }
    }
}
