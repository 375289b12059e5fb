//! HTTP client wrapper used to send every probe

use crate::error::{Result, TransactionError, WatcherError};
use crate::models::{BaseRequest, WatchConfig};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Status, headers and body size of an answered request
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Body size in bytes, `None` when the body could not be read
    pub body_length: Option<usize>,
}

/// Sends one request and reports what came back.
///
/// Implementations are shared by every in-flight transaction and must not
/// keep per-request state.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` exactly once
    async fn send(&self, request: &BaseRequest) -> std::result::Result<RawResponse, TransactionError>;
}

/// reqwest based transport with a fixed timeout and optional proxy
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Option<Duration>,
    request_count: Arc<AtomicU64>,
}

impl HttpClient {
    /// Creates a new HttpClient from the watch configuration
    pub fn from_config(config: &WatchConfig) -> Result<Self> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none());

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(ref proxy_url) = config.proxy {
            if !proxy_url.starts_with("http://") && !proxy_url.starts_with("socks5://") {
                return Err(WatcherError::ConfigError(format!(
                    "Unsupported proxy scheme: {proxy_url}"
                )));
            }
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| WatcherError::ConfigError(format!("Invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            timeout,
            request_count: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Returns the total number of requests sent
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: &BaseRequest) -> std::result::Result<RawResponse, TransactionError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransactionError::InvalidRequest(format!("{}: {e}", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        self.request_count.fetch_add(1, Ordering::Relaxed);
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body_length = match response.bytes().await {
            Ok(body) => Some(body.len()),
            Err(e) => {
                debug!("Unable to read body from {}: {e}", request.url);
                None
            }
        };

        Ok(RawResponse {
            status,
            headers,
            body_length,
        })
    }
}
