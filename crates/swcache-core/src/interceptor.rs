//! Read-through fetch interception.
//!
//! Per request: filter by host and URL pattern, look the request up across
//! every store, and on a miss fetch it, store a copy in the runtime store
//! and hand the response back. Nothing raised here ever reaches the page:
//! transport and storage failures degrade to [`FetchOutcome::Empty`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::request::{Request, Response};
use crate::platform::Platform;

/// Where a produced response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// Why a request was left to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bypass {
    /// Host is in the ignored set.
    IgnoredHost(String),
    /// URL contains an excluded pattern.
    ExcludedUrl(String),
    /// Scheme the cache cannot hold (not http/https).
    Scheme(String),
}

/// Result of intercepting one request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; default network handling applies.
    PassThrough,
    /// Answered by the worker.
    Respond(Response, ResponseSource),
    /// The network failed on a miss. The page gets no response.
    Empty,
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond(response, _) => Some(response),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Respond(response, _) => Some(response),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Respond(_, source) => Some(*source),
            _ => None,
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, FetchOutcome::PassThrough)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchOutcome::Empty)
    }
}

/// Counters for interception decisions and suppressed failures.
#[derive(Debug, Default)]
pub struct InterceptStats {
    passed_through: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    network_failures: AtomicU64,
    lookup_failures: AtomicU64,
    store_failures: AtomicU64,
}

/// Point-in-time copy of [`InterceptStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub passed_through: u64,
    pub hits: u64,
    pub misses: u64,
    pub network_failures: u64,
    pub lookup_failures: u64,
    pub store_failures: u64,
}

impl InterceptStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            passed_through: self.passed_through.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network_failures: self.network_failures.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

/// Cache-first request handler with runtime caching of misses.
#[derive(Debug)]
pub struct Interceptor {
    config: Arc<CacheConfig>,
    stats: InterceptStats,
}

impl Interceptor {
    pub fn new(config: Arc<CacheConfig>) -> Self {
        Self {
            config,
            stats: InterceptStats::default(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Decide whether `request` is left to the platform.
    pub fn bypass(&self, request: &Request) -> Option<Bypass> {
        let url = &request.url;
        if !matches!(url.scheme(), "http" | "https") {
            return Some(Bypass::Scheme(url.scheme().to_string()));
        }
        if let Some(host) = url.host_str() {
            if self.config.is_ignored_host(host) {
                return Some(Bypass::IgnoredHost(host.to_string()));
            }
        }
        self.config
            .excluded_pattern(url.as_str())
            .map(|pattern| Bypass::ExcludedUrl(pattern.to_string()))
    }

    /// Handle one intercepted request.
    pub async fn handle(&self, platform: &dyn Platform, request: &Request) -> FetchOutcome {
        if let Some(reason) = self.bypass(request) {
            trace!(url = %request.url, reason = ?reason, "Passing request through");
            InterceptStats::bump(&self.stats.passed_through);
            return FetchOutcome::PassThrough;
        }

        match platform.caches().match_request(request).await {
            Ok(Some(cached)) => {
                trace!(url = %request.url, "Cache hit");
                InterceptStats::bump(&self.stats.hits);
                return FetchOutcome::Respond(cached, ResponseSource::Cache);
            }
            Ok(None) => {
                InterceptStats::bump(&self.stats.misses);
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Cache lookup failed");
                InterceptStats::bump(&self.stats.lookup_failures);
                return FetchOutcome::Empty;
            }
        }

        self.fetch_and_store(platform, request).await
    }

    async fn fetch_and_store(&self, platform: &dyn Platform, request: &Request) -> FetchOutcome {
        let runtime_name = self.config.keys().runtime;
        let runtime = match platform.caches().open(&runtime_name).await {
            Ok(cache) => cache,
            Err(e) => {
                warn!(cache = %runtime_name, error = %e, "Opening runtime cache failed");
                InterceptStats::bump(&self.stats.store_failures);
                return FetchOutcome::Empty;
            }
        };

        let response = match platform.network().fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %request.url, error = %e, "Network fetch failed; responding empty");
                InterceptStats::bump(&self.stats.network_failures);
                return FetchOutcome::Empty;
            }
        };

        // One copy for the store, the original for the page.
        match runtime.put(request, response.clone()).await {
            Ok(()) => debug!(url = %request.url, status = %response.status, "Stored in runtime cache"),
            Err(e) => {
                warn!(url = %request.url, error = %e, "Runtime cache put failed");
                InterceptStats::bump(&self.stats.store_failures);
            }
        }

        FetchOutcome::Respond(response, ResponseSource::Network)
    }
}
