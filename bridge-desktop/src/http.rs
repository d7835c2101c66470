//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("signin-core/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Opt-in retry with exponential backoff on 5xx and 429
///   ([`HttpClient::execute_with_retry`])
/// - rustls TLS
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    /// Strip the query string, which carries the API key.
    fn loggable_url(url: &str) -> &str {
        url.split('?').next().unwrap_or(url)
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn transport_error(e: reqwest::Error) -> BridgeError {
        let e = e.without_url();
        if e.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }

    /// Send `request` up to `policy.max_attempts` times.
    ///
    /// 5xx and 429 responses are retried while attempts remain; the last one
    /// is returned as is so callers can read the error body.
    async fn execute_with_retry_internal(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let last_attempt = attempt >= max_attempts;
            debug!(
                attempt,
                max_attempts,
                url = Self::loggable_url(&request.url),
                "Executing HTTP request"
            );

            match self.build_request(request.clone()).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retryable = status >= 500 || status == 429;
                    if !retryable || last_attempt {
                        return Self::into_response(response).await;
                    }
                    warn!(status, attempt, "HTTP request failed with retryable status");
                }
                Err(e) => {
                    let err = Self::transport_error(e);
                    warn!(error = %err, attempt, "HTTP request failed");
                    if last_attempt {
                        return Err(err);
                    }
                }
            }

            let delay = policy.delay_for(attempt);
            debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    /// A single attempt. Backend calls are never replayed implicitly.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, RetryPolicy::no_retry())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, policy).await
    }
}
