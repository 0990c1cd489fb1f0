//! Platform seams: cache storage, network and client control.
//!
//! The worker logic only talks to these traits. [`LocalPlatform`] wires the
//! in-memory storage and client registry to any [`Network`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::MemoryClients;
use crate::error::SwResult;
use crate::request::{Request, Response};
use crate::storage::MemoryCacheStorage;

/// One named cache store.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store name.
    fn name(&self) -> &str;

    /// Find the response stored for `request` (URL and method).
    async fn match_request(&self, request: &Request) -> SwResult<Option<Response>>;

    /// Store `response` under `request`, replacing any previous entry.
    async fn put(&self, request: &Request, response: Response) -> SwResult<()>;

    /// Store every pair or none of them.
    async fn put_all(&self, entries: Vec<(Request, Response)>) -> SwResult<()>;

    async fn delete(&self, request: &Request) -> SwResult<bool>;

    /// Stored requests in insertion order.
    async fn keys(&self) -> SwResult<Vec<Request>>;
}

/// The set of named cache stores (the `caches` global).
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if absent.
    async fn open(&self, name: &str) -> SwResult<Arc<dyn Cache>>;

    async fn has(&self, name: &str) -> SwResult<bool>;

    /// Match across all stores, oldest store first.
    async fn match_request(&self, request: &Request) -> SwResult<Option<Response>>;

    /// Delete a store. `Ok(false)` when it did not exist.
    async fn delete(&self, name: &str) -> SwResult<bool>;

    /// Store names in creation order.
    async fn keys(&self) -> SwResult<Vec<String>>;
}

/// Network fetch facility.
///
/// Any response the server produced is `Ok`, whatever its status; `Err`
/// means no response at all.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> SwResult<Response>;
}

/// Control over the pages the worker serves.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Take control of every open client. Returns how many are now
    /// controlled by `version`.
    async fn claim(&self, version: &str) -> SwResult<usize>;
}

/// Everything a worker handler may touch.
pub trait Platform: Send + Sync {
    fn caches(&self) -> &dyn CacheStorage;
    fn network(&self) -> &dyn Network;
    fn clients(&self) -> &dyn Clients;
}

/// In-process platform: memory-backed caches and clients over any network.
///
/// Storage is shared so a later worker version can see the stores an
/// earlier one left behind.
pub struct LocalPlatform<N> {
    caches: Arc<MemoryCacheStorage>,
    clients: MemoryClients,
    network: N,
}

impl<N: Network> LocalPlatform<N> {
    pub fn new(network: N) -> Self {
        Self::with_storage(Arc::new(MemoryCacheStorage::new()), network)
    }

    /// Start from existing storage, e.g. one holding a previous generation.
    pub fn with_storage(caches: Arc<MemoryCacheStorage>, network: N) -> Self {
        Self {
            caches,
            clients: MemoryClients::new(),
            network,
        }
    }

    pub fn storage(&self) -> &Arc<MemoryCacheStorage> {
        &self.caches
    }

    pub fn client_registry(&self) -> &MemoryClients {
        &self.clients
    }
}

impl<N: Network> Platform for LocalPlatform<N> {
    fn caches(&self) -> &dyn CacheStorage {
        self.caches.as_ref()
    }

    fn network(&self) -> &dyn Network {
        &self.network
    }

    fn clients(&self) -> &dyn Clients {
        &self.clients
    }
}
