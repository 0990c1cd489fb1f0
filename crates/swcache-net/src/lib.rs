//! # swcache net
//!
//! Network facility for the offline cache worker, backed by `reqwest`.
//!
//! Every response the server sends back is handed to the worker as-is,
//! whatever its status. Only transport failures (connection refused, DNS,
//! timeout) become errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use swcache_core::{Network, Request, Response, SwError, SwResult};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors that can occur in networking.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<NetError> for SwError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::InvalidUrl(message) => SwError::InvalidUrl(message),
            other => SwError::Network(other.to_string()),
        }
    }
}

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// User agent string.
    pub user_agent: String,
    /// Default timeout.
    pub default_timeout: Duration,
    /// Maximum redirects.
    pub max_redirects: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("swcache/{}", env!("CARGO_PKG_VERSION")),
            default_timeout: Duration::from_secs(30),
            max_redirects: 10,
        }
    }
}

/// [`Network`] implementation over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: Client,
    config: LoaderConfig,
}

impl HttpNetwork {
    /// Create a new network with the given configuration.
    pub fn new(config: LoaderConfig) -> Result<Self, NetError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.default_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| NetError::RequestFailed(e.to_string()))?;

        info!(user_agent = %config.user_agent, "HttpNetwork initialized");

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Perform the request and read the whole body.
    pub async fn send(&self, request: &Request) -> Result<Response, NetError> {
        debug!(url = %request.url, method = %request.method, "Fetching resource");

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        trace!(url = %url, status = %status, body_len = body.len(), "Response received");

        Ok(Response {
            url,
            status,
            headers,
            body,
        })
    }

    fn classify(&self, err: reqwest::Error) -> NetError {
        if err.is_timeout() {
            NetError::Timeout(self.config.default_timeout)
        } else if err.is_builder() {
            NetError::InvalidUrl(err.to_string())
        } else {
            NetError::Http(err)
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> SwResult<Response> {
        Ok(self.send(request).await?)
    }
}
