//! # swcache core
//!
//! Offline-first cache lifecycle for a website's service worker.
//!
//! ## Features
//!
//! - **Pre-cache**: a curated asset list is stored when the worker installs
//! - **Generation reaping**: stores from older versions are deleted on activation
//! - **Read-through**: misses are fetched, stored in the runtime cache, and returned
//! - **Platform seams**: cache storage, network and clients are traits, with an
//!   in-memory implementation for hosts and tests
//!
//! ## Architecture
//!
//! ```text
//! WorkerRuntime (install → activate → fetch)
//!     │
//!     └── OfflineWorker (WorkerHandler)
//!             ├── Populator    → caches.open(precache-<v>).put_all(..)
//!             ├── Reaper       → caches.keys() / caches.delete(..) / clients.claim()
//!             └── Interceptor  → caches.match(..) / network.fetch(..) / runtime.put(..)
//!
//! Platform
//!     ├── CacheStorage ── Cache ── Request → Response
//!     ├── Network
//!     └── Clients
//! ```

pub mod clients;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod platform;
pub mod populator;
pub mod reaper;
pub mod request;
pub mod storage;
pub mod worker;

pub use clients::{Client, MemoryClients};
pub use config::{CacheConfig, CacheKeys};
pub use error::{SwError, SwResult};
pub use interceptor::{Bypass, FetchOutcome, Interceptor, ResponseSource, StatsSnapshot};
pub use lifecycle::{
    ActivateEvent, FetchEvent, InstallEvent, WorkerEvent, WorkerHandler, WorkerRuntime,
    WorkerState,
};
pub use platform::{Cache, CacheStorage, Clients, LocalPlatform, Network, Platform};
pub use populator::Populator;
pub use reaper::{ReapReport, Reaper};
pub use request::{CacheEntry, Request, RequestKey, Response};
pub use storage::{MemoryCache, MemoryCacheStorage};
pub use worker::OfflineWorker;
