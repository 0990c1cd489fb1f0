//! Client pages the worker may control.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use hashbrown::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::error::SwResult;
use crate::platform::Clients;

/// An open page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub url: Url,
    /// Version of the worker controlling this client, if any.
    pub controller: Option<String>,
}

impl Client {
    pub fn window(url: Url) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self {
            id: format!("client-{}", COUNTER.fetch_add(1, Ordering::Relaxed)),
            url,
            controller: None,
        }
    }

    /// Attach to an existing worker version.
    pub fn controlled_by(mut self, version: impl Into<String>) -> Self {
        self.controller = Some(version.into());
        self
    }
}

/// In-memory client registry.
#[derive(Debug, Default)]
pub struct MemoryClients {
    clients: RwLock<HashMap<String, Client>>,
}

impl MemoryClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client.
    pub async fn add(&self, client: Client) {
        self.clients.write().await.insert(client.id.clone(), client);
    }

    /// Remove a client.
    pub async fn remove(&self, id: &str) -> Option<Client> {
        self.clients.write().await.remove(id)
    }

    /// Get a client by ID.
    pub async fn get(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    /// All clients controlled by `version`.
    pub async fn controlled_by(&self, version: &str) -> Vec<Client> {
        self.clients
            .read()
            .await
            .values()
            .filter(|c| c.controller.as_deref() == Some(version))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Clients for MemoryClients {
    async fn claim(&self, version: &str) -> SwResult<usize> {
        let mut clients = self.clients.write().await;
        for client in clients.values_mut() {
            if client.controller.as_deref() != Some(version) {
                debug!(client = %client.id, from = ?client.controller, to = version, "Claiming client");
                client.controller = Some(version.to_string());
            }
        }
        Ok(clients.len())
    }
}
