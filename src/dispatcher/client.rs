//! HTTP client for a remote node.
//!
//! Thin wrapper over the endpoints in `protocol`. Idempotent calls (register,
//! object lookup, stats, teardown) retry transport failures with exponential
//! backoff; execute is sent once since a retried execute would run twice.

use super::protocol::*;
use super::types::{ExecuteRequest, ExecuteResponse};
use crate::storage::protocol::{
    ENDPOINT_GET_OBJECT, GetObjectRequest, GetObjectResponse, RemoteObjectIdProto,
};

use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
const RETRY_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct RemoteClient {
    base_url: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl RemoteClient {
    /// `base_url` is `http://host:port`, without a trailing slash.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(
        &self,
        program_name: &str,
        program: &str,
        disable_optional_sections: bool,
    ) -> Result<RegisterResponse> {
        let payload = RegisterRequest {
            program_name: program_name.to_string(),
            program: program.to_string(),
            disable_optional_sections,
        };

        let response = self
            .post_with_retry(self.url(ENDPOINT_REGISTER), &payload, self.timeout, RETRY_ATTEMPTS)
            .await?;
        response
            .json::<RegisterResponse>()
            .await
            .context("Malformed register response")
    }

    /// Sends one execute and waits for the node's completion.
    ///
    /// The server holds the connection until the callback fires, so the HTTP
    /// timeout here should be at least the node's request timeout.
    pub async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse> {
        let response = self
            .post_with_retry(self.url(ENDPOINT_EXECUTE), request, self.timeout, 1)
            .await?;
        response
            .json::<ExecuteResponse>()
            .await
            .context("Malformed execute response")
    }

    pub async fn get_object(
        &self,
        id: RemoteObjectIdProto,
        wait_ms: Option<u64>,
    ) -> Result<GetObjectResponse> {
        let payload = GetObjectRequest { id, wait_ms };
        let timeout = self.timeout + Duration::from_millis(wait_ms.unwrap_or(0));

        let response = self
            .post_with_retry(self.url(ENDPOINT_GET_OBJECT), &payload, timeout, RETRY_ATTEMPTS)
            .await?;
        response
            .json::<GetObjectResponse>()
            .await
            .context("Malformed object response")
    }

    /// Returns whether the node had the program cached.
    pub async fn evict_program(&self, program_name: &str) -> Result<bool> {
        let url = self.url(&format!("{}/{}", ENDPOINT_PROGRAM, program_name));
        let response = self
            .http_client
            .delete(url)
            .timeout(self.timeout)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let body = response
            .error_for_status()?
            .json::<EvictProgramResponse>()
            .await?;
        Ok(body.removed)
    }

    pub async fn teardown(&self, prefix_id: Option<i32>) -> Result<TeardownResponse> {
        let payload = TeardownRequest { prefix_id };
        let response = self
            .post_with_retry(self.url(ENDPOINT_TEARDOWN), &payload, self.timeout, RETRY_ATTEMPTS)
            .await?;
        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn stats(&self) -> Result<StatsResponse> {
        let response = self
            .get_with_retry(self.url(ENDPOINT_STATS), self.timeout, RETRY_ATTEMPTS)
            .await?;
        Ok(response.error_for_status()?.json().await?)
    }

    // --- HTTP Helpers with Backoff ---

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        url: String,
        payload: &T,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    tracing::debug!("POST {} failed (attempt {}): {}", url, attempt + 1, e);
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }

    async fn get_with_retry(
        &self,
        url: String,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .get(url.clone())
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}
