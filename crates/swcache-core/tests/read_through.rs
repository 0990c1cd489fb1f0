//! Fetch interception: filtering, cache hits, read-through misses and
//! suppressed network failures.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{config, init_tracing, platform, request, url, StubNetwork};
use http::{Method, StatusCode};
use swcache_core::{
    Cache, CacheStorage, Clients, FetchOutcome, Interceptor, MemoryCacheStorage, MemoryClients,
    Network, Platform, Request, Response, ResponseSource, SwError, SwResult,
};

fn interceptor(cfg: swcache_core::CacheConfig) -> Interceptor {
    Interceptor::new(Arc::new(cfg))
}

#[tokio::test]
async fn test_ignored_host_passes_through_untouched() {
    init_tracing();
    let network = StubNetwork::new();
    let platform = platform(network.clone());
    let interceptor = interceptor(config("v1").with_ignored_hosts(["unpkg.com"]));

    let req = Request::parse("https://unpkg.com/netlify-cms@2.10.0/dist/netlify-cms.js").unwrap();
    let outcome = interceptor.handle(platform.as_ref(), &req).await;

    assert!(outcome.is_pass_through());
    assert_eq!(network.calls(), 0);
    assert!(platform.storage().keys().await.unwrap().is_empty());
    assert_eq!(interceptor.stats().passed_through, 1);
}

#[tokio::test]
async fn test_excluded_url_passes_through_untouched() {
    let network = StubNetwork::new();
    let platform = platform(network.clone());
    let interceptor = interceptor(config("v1").with_excluded_urls(["admin", ".netlify"]));

    for path in ["/admin/", "/.netlify/identity/token"] {
        let outcome = interceptor.handle(platform.as_ref(), &request(path)).await;
        assert!(outcome.is_pass_through(), "{path} should pass through");
    }
    assert_eq!(network.calls(), 0);
    assert!(platform.storage().keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hit_in_any_store_skips_network() {
    let network = StubNetwork::new();
    let platform = platform(network.clone());
    let precache = platform.storage().open("precache-v1").await.unwrap();
    let asset = url("/js/index.min.js");
    precache
        .put(
            &Request::get(asset.clone()),
            Response::new(asset.clone(), StatusCode::OK, "cached"),
        )
        .await
        .unwrap();

    let interceptor = interceptor(config("v1"));
    let outcome = interceptor
        .handle(platform.as_ref(), &Request::get(asset))
        .await;

    assert_eq!(outcome.source(), Some(ResponseSource::Cache));
    assert_eq!(outcome.response().unwrap().text().unwrap(), "cached");
    assert_eq!(network.calls(), 0);
    assert_eq!(interceptor.stats().hits, 1);
}

#[tokio::test]
async fn test_hit_ignores_fragment() {
    let network = StubNetwork::new();
    let platform = platform(network.clone());
    let runtime = platform.storage().open("runtime-v1").await.unwrap();
    let page = url("/about/");
    runtime
        .put(&Request::get(page.clone()), Response::new(page, StatusCode::OK, "about"))
        .await
        .unwrap();

    let outcome = interceptor(config("v1"))
        .handle(platform.as_ref(), &request("/about/#team"))
        .await;
    assert_eq!(outcome.source(), Some(ResponseSource::Cache));
    assert_eq!(network.calls(), 0);
}

#[tokio::test]
async fn test_miss_returns_network_body_and_stores_copy() {
    let network = StubNetwork::new();
    let asset = url("/images/codeart/donut.gif");
    network.serve(&asset, "GIF89a-donut");
    let platform = platform(network.clone());
    let interceptor = interceptor(config("v1"));

    let outcome = interceptor
        .handle(platform.as_ref(), &Request::get(asset.clone()))
        .await;

    assert_eq!(outcome.source(), Some(ResponseSource::Network));
    let response = outcome.into_response().unwrap();
    assert_eq!(response.body.as_ref(), b"GIF89a-donut");

    let runtime = platform.storage().get("runtime-v1").await.unwrap();
    let stored = runtime
        .match_request(&Request::get(asset))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.body, response.body);
    assert_eq!(network.calls(), 1);
    assert_eq!(interceptor.stats().misses, 1);
}

#[tokio::test]
async fn test_second_request_is_served_from_runtime_cache() {
    let network = StubNetwork::new();
    let asset = url("/js/typeface.json");
    network.serve(&asset, "{}");
    let platform = platform(network.clone());
    let interceptor = interceptor(config("v1"));

    let first = interceptor.handle(platform.as_ref(), &Request::get(asset.clone())).await;
    let second = interceptor.handle(platform.as_ref(), &Request::get(asset)).await;

    assert_eq!(first.source(), Some(ResponseSource::Network));
    assert_eq!(second.source(), Some(ResponseSource::Cache));
    assert_eq!(first.response(), second.response());
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn test_network_failure_yields_empty_and_stores_nothing() {
    init_tracing();
    let network = StubNetwork::new();
    let asset = url("/installations/");
    network.fail(&asset);
    let platform = platform(network.clone());
    let interceptor = interceptor(config("v1"));

    let outcome = interceptor.handle(platform.as_ref(), &Request::get(asset)).await;

    assert!(outcome.is_empty());
    for name in platform.storage().keys().await.unwrap() {
        let cache = platform.storage().get(&name).await.unwrap();
        assert!(cache.is_empty().await, "{name} should hold no entries");
    }
    assert_eq!(interceptor.stats().network_failures, 1);
}

#[tokio::test]
async fn test_error_status_is_returned_and_cached() {
    let network = StubNetwork::new();
    let missing = url("/gone/");
    network.serve_status(&missing, StatusCode::NOT_FOUND, "not found");
    let platform = platform(network.clone());

    let outcome = interceptor(config("v1"))
        .handle(platform.as_ref(), &Request::get(missing.clone()))
        .await;

    assert_eq!(outcome.response().unwrap().status, StatusCode::NOT_FOUND);
    let runtime = platform.storage().get("runtime-v1").await.unwrap();
    assert_eq!(runtime.len().await, 1);
}

#[tokio::test]
async fn test_uncacheable_request_still_gets_response() {
    let network = StubNetwork::new();
    let form = url("/contact/");
    network.serve(&form, "thanks");
    let platform = platform(network.clone());
    let interceptor = interceptor(config("v1"));

    let post = Request::get(form).with_method(Method::POST);
    let outcome = interceptor.handle(platform.as_ref(), &post).await;

    assert_eq!(outcome.response().unwrap().text().unwrap(), "thanks");
    let runtime = platform.storage().get("runtime-v1").await.unwrap();
    assert!(runtime.is_empty().await);
    assert_eq!(interceptor.stats().store_failures, 1);
}

#[tokio::test]
async fn test_concurrent_misses_are_independent() {
    let network = StubNetwork::new().with_delay(Duration::from_millis(20));
    let paths = ["/a.js", "/b.js", "/c.js", "/d.js"];
    for path in paths {
        network.serve(&url(path), path);
    }
    let platform = platform(network.clone());
    let interceptor = Arc::new(interceptor(config("v1")));

    let tasks: Vec<_> = paths
        .iter()
        .map(|path| {
            let platform = Arc::clone(&platform);
            let interceptor = Arc::clone(&interceptor);
            let req = request(path);
            tokio::spawn(async move { interceptor.handle(platform.as_ref(), &req).await })
        })
        .collect();

    for (path, task) in paths.iter().zip(tasks) {
        let outcome = task.await.unwrap();
        assert_eq!(outcome.response().unwrap().text().unwrap(), *path);
    }

    let runtime = platform.storage().get("runtime-v1").await.unwrap();
    assert_eq!(runtime.len().await, paths.len());
    assert_eq!(network.calls(), paths.len());
}

/// Storage whose lookups or opens are refused.
#[derive(Default)]
struct RefusingStorage {
    inner: MemoryCacheStorage,
    refuse_lookup: bool,
    refuse_open: bool,
}

#[async_trait]
impl CacheStorage for RefusingStorage {
    async fn open(&self, name: &str) -> SwResult<Arc<dyn Cache>> {
        if self.refuse_open {
            return Err(SwError::cache(format!("open of '{name}' refused")));
        }
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> SwResult<bool> {
        self.inner.has(name).await
    }

    async fn match_request(&self, request: &Request) -> SwResult<Option<Response>> {
        if self.refuse_lookup {
            return Err(SwError::cache("lookup refused"));
        }
        self.inner.match_request(request).await
    }

    async fn delete(&self, name: &str) -> SwResult<bool> {
        self.inner.delete(name).await
    }

    async fn keys(&self) -> SwResult<Vec<String>> {
        self.inner.keys().await
    }
}

struct RefusingPlatform {
    caches: RefusingStorage,
    network: StubNetwork,
    clients: MemoryClients,
}

impl Platform for RefusingPlatform {
    fn caches(&self) -> &dyn CacheStorage {
        &self.caches
    }

    fn network(&self) -> &dyn Network {
        &self.network
    }

    fn clients(&self) -> &dyn Clients {
        &self.clients
    }
}

fn refusing(caches: RefusingStorage, network: StubNetwork) -> RefusingPlatform {
    RefusingPlatform {
        caches,
        network,
        clients: MemoryClients::new(),
    }
}

#[tokio::test]
async fn test_lookup_failure_yields_empty() {
    let network = StubNetwork::new();
    network.serve(&url("/about/"), "about");
    let platform = refusing(
        RefusingStorage {
            refuse_lookup: true,
            ..Default::default()
        },
        network.clone(),
    );
    let interceptor = interceptor(config("v1"));

    let outcome = interceptor.handle(&platform, &request("/about/")).await;

    assert_eq!(outcome, FetchOutcome::Empty);
    assert_eq!(network.calls(), 0);
    let stats = interceptor.stats();
    assert_eq!(stats.lookup_failures, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_runtime_open_failure_yields_empty() {
    let network = StubNetwork::new();
    network.serve(&url("/codeart/"), "codeart");
    let platform = refusing(
        RefusingStorage {
            refuse_open: true,
            ..Default::default()
        },
        network.clone(),
    );
    let interceptor = interceptor(config("v1"));

    let outcome = interceptor.handle(&platform, &request("/codeart/")).await;

    assert_eq!(outcome, FetchOutcome::Empty);
    assert_eq!(network.calls(), 0);
    assert!(platform.caches.inner.keys().await.unwrap().is_empty());
    let stats = interceptor.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.store_failures, 1);
}
