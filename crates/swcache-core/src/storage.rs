//! In-memory cache storage.

use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};
use http::{Method, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::error::{SwError, SwResult};
use crate::request::{CacheEntry, Request, RequestKey, Response};
use crate::platform::{Cache, CacheStorage};

// ==================== Cache ====================

#[derive(Debug, Default)]
struct Entries {
    by_key: HashMap<RequestKey, CacheEntry>,
    order: Vec<RequestKey>,
}

impl Entries {
    fn insert(&mut self, entry: CacheEntry) {
        let key = entry.request.key();
        if self.by_key.insert(key.clone(), entry).is_none() {
            self.order.push(key);
        }
    }
}

/// A memory-backed cache store.
#[derive(Debug)]
pub struct MemoryCache {
    name: String,
    entries: RwLock<Entries>,
}

impl MemoryCache {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(Entries::default()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Rejections the platform cache applies on put.
fn check_storable(request: &Request, response: &Response) -> SwResult<()> {
    if request.method != Method::GET {
        return Err(SwError::cache(format!(
            "Request method '{}' is unsupported",
            request.method
        )));
    }
    if response.status == StatusCode::PARTIAL_CONTENT {
        return Err(SwError::cache("Partial response (status code 206) is unsupported"));
    }
    Ok(())
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> SwResult<Option<Response>> {
        let entries = self.entries.read().await;
        Ok(entries
            .by_key
            .get(&request.key())
            .map(|e| e.response.clone()))
    }

    async fn put(&self, request: &Request, response: Response) -> SwResult<()> {
        check_storable(request, &response)?;
        trace!(cache = %self.name, url = %request.url, "Cache put");
        self.entries
            .write()
            .await
            .insert(CacheEntry {
                request: request.clone(),
                response,
            });
        Ok(())
    }

    async fn put_all(&self, pairs: Vec<(Request, Response)>) -> SwResult<()> {
        for (request, response) in &pairs {
            check_storable(request, response)?;
        }
        let mut entries = self.entries.write().await;
        for (request, response) in pairs {
            entries.insert(CacheEntry { request, response });
        }
        Ok(())
    }

    async fn delete(&self, request: &Request) -> SwResult<bool> {
        let key = request.key();
        let mut entries = self.entries.write().await;
        let removed = entries.by_key.remove(&key).is_some();
        if removed {
            entries.order.retain(|k| k != &key);
        }
        Ok(removed)
    }

    async fn keys(&self) -> SwResult<Vec<Request>> {
        let entries = self.entries.read().await;
        Ok(entries
            .order
            .iter()
            .filter_map(|k| entries.by_key.get(k))
            .map(|e| e.request.clone())
            .collect())
    }
}

// ==================== Cache Storage ====================

#[derive(Debug, Default)]
struct Stores {
    by_name: HashMap<String, Arc<MemoryCache>>,
    order: Vec<String>,
}

/// Memory-backed storage for named caches.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    stores: RwLock<Stores>,
    /// Names whose deletion is refused, simulating a platform denial.
    denied_deletes: RwLock<HashSet<String>>,
}

impl MemoryCacheStorage {
    /// Create new cache storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store and get its concrete handle.
    pub async fn open_memory(&self, name: &str) -> Arc<MemoryCache> {
        let mut stores = self.stores.write().await;
        if let Some(cache) = stores.by_name.get(name) {
            return Arc::clone(cache);
        }
        debug!(cache = name, "Creating cache store");
        let cache = Arc::new(MemoryCache::new(name));
        stores.by_name.insert(name.to_string(), Arc::clone(&cache));
        stores.order.push(name.to_string());
        cache
    }

    /// Get an existing store without creating it.
    pub async fn get(&self, name: &str) -> Option<Arc<MemoryCache>> {
        self.stores.read().await.by_name.get(name).cloned()
    }

    /// Refuse future deletions of `name`.
    pub async fn deny_delete(&self, name: &str) {
        self.denied_deletes.write().await.insert(name.to_string());
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> SwResult<Arc<dyn Cache>> {
        let cache: Arc<dyn Cache> = self.open_memory(name).await;
        Ok(cache)
    }

    async fn has(&self, name: &str) -> SwResult<bool> {
        Ok(self.stores.read().await.by_name.contains_key(name))
    }

    async fn match_request(&self, request: &Request) -> SwResult<Option<Response>> {
        let caches: Vec<Arc<MemoryCache>> = {
            let stores = self.stores.read().await;
            stores
                .order
                .iter()
                .filter_map(|name| stores.by_name.get(name).cloned())
                .collect()
        };
        for cache in caches {
            if let Some(response) = cache.match_request(request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn delete(&self, name: &str) -> SwResult<bool> {
        if self.denied_deletes.read().await.contains(name) {
            return Err(SwError::cache(format!("Deletion of '{name}' denied")));
        }
        let mut stores = self.stores.write().await;
        let removed = stores.by_name.remove(name).is_some();
        if removed {
            stores.order.retain(|n| n != name);
        }
        Ok(removed)
    }

    async fn keys(&self) -> SwResult<Vec<String>> {
        Ok(self.stores.read().await.order.clone())
    }
}
