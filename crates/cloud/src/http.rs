//! HTTP client wrapper returning decoded JSON, with retry logic.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{CloudError, Result};

/// Upper bound on the delay between two attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// HTTP client for JSON feature-service endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    initial_backoff: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(request_timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("streamviz/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_retries,
            initial_backoff: Duration::from_millis(250),
        })
    }

    /// Override the delay before the first retry (doubles on each attempt).
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Delay before retry number `attempt` (1-based), capped at [`MAX_BACKOFF`].
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let req = self.client.get(url).query(query);
        self.send_json(url, req).await
    }

    /// POST a urlencoded form to `url` and decode the JSON body.
    ///
    /// ArcGIS `/query` accepts the same parameters via GET, but polygon
    /// filters easily overflow URL length limits.
    pub async fn post_form_json<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<T> {
        let req = self.client.post(url).form(form);
        self.send_json(url, req).await
    }

    async fn send_json<T: DeserializeOwned>(&self, url: &str, request: RequestBuilder) -> Result<T> {
        let resp = self.execute_with_retry(url, request).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CloudError::Network(format!(
                "HTTP {} fetching {}: {}",
                status,
                url,
                body.chars().take(300).collect::<String>()
            )));
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| CloudError::InvalidResponse {
            url: url.to_string(),
            reason: format!("parsing JSON: {e}"),
        })
    }

    /// Execute a request with exponential backoff retry.
    ///
    /// Timeouts, connection failures and 5xx responses are retried; other
    /// statuses are returned to the caller as-is.
    async fn execute_with_retry(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                warn!(url, attempt, ?delay, "retrying request");
                tokio::time::sleep(delay).await;
            }

            let Some(cloned) = request.try_clone() else {
                return Ok(request.send().await?);
            };

            match cloned.send().await {
                Ok(resp) if resp.status().is_server_error() && attempt < self.max_retries => {
                    debug!(url, status = %resp.status(), "server error");
                    last_err = Some(CloudError::Network(format!(
                        "HTTP {} fetching {}",
                        resp.status(),
                        url
                    )));
                }
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    debug!(url, error = %e, "transient failure");
                    last_err = Some(CloudError::Http(e));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err.unwrap_or_else(|| CloudError::Network(format!("request to {url} failed"))))
    }
}
