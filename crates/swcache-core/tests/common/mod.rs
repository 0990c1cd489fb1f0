//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use swcache_core::{CacheConfig, LocalPlatform, Network, Request, Response, SwError, SwResult};
use url::Url;

pub const ORIGIN: &str = "https://ilithya.rocks/";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn url(path: &str) -> Url {
    origin().join(path).unwrap()
}

pub fn request(path: &str) -> Request {
    Request::get(url(path))
}

/// Configuration with no exclusions, for tests that set only what they need.
pub fn config(version: &str) -> CacheConfig {
    CacheConfig::empty(origin(), version)
}

pub fn init_tracing() {
    let _ = swcache_common::init_logging(
        swcache_common::LogConfig::debug().with_filter("swcache_core=debug"),
    );
}

#[derive(Debug, Clone)]
enum Reply {
    Body(StatusCode, Vec<u8>),
    Fail,
}

/// Network stub serving canned replies and counting calls.
///
/// Unknown URLs fail like an offline network.
#[derive(Debug, Clone, Default)]
pub struct StubNetwork {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn serve(&self, url: &Url, body: &str) -> &Self {
        self.serve_status(url, StatusCode::OK, body)
    }

    pub fn serve_status(&self, url: &Url, status: StatusCode, body: &str) -> &Self {
        self.replies.lock().unwrap().insert(
            url.to_string(),
            Reply::Body(status, body.as_bytes().to_vec()),
        );
        self
    }

    pub fn fail(&self, url: &Url) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Fail);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> SwResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned();
        match reply {
            Some(Reply::Body(status, body)) => Ok(Response::new(request.url.clone(), status, body)),
            Some(Reply::Fail) | None => Err(SwError::network(format!(
                "failed to fetch {}",
                request.url
            ))),
        }
    }
}

pub fn platform(network: StubNetwork) -> Arc<LocalPlatform<StubNetwork>> {
    Arc::new(LocalPlatform::new(network))
}
