//! Shared HTTP plumbing for backend calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{info_span, Instrument};

use crate::config::BackendConfig;
use crate::error::{ClientError, ClientResult};
use crate::metrics::record_request;

/// Backend HTTP client. Cheap to clone.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    config: Arc<BackendConfig>,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> ClientResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("mthumb-worker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Start a request with auth and the given timeout applied.
    pub fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path)).timeout(timeout);
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Run one backend call inside a span and record its metrics.
    pub async fn execute<T, F>(&self, operation: &str, fut: F) -> ClientResult<T>
    where
        F: std::future::Future<Output = ClientResult<T>>,
    {
        let span = info_span!("backend_request", operation = %operation);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    /// Convert a non-success response into a classified error.
    pub async fn error_response(response: Response) -> ClientError {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        ClientError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}
