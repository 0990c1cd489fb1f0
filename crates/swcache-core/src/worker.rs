//! The site's offline worker: pre-cache on install, reap on activate,
//! read-through on fetch.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::CacheConfig;
use crate::error::SwResult;
use crate::interceptor::{FetchOutcome, Interceptor, StatsSnapshot};
use crate::lifecycle::{ActivateEvent, FetchEvent, InstallEvent, WorkerHandler};
use crate::populator::Populator;
use crate::reaper::{ReapReport, Reaper};

/// Worker handler built from one immutable configuration.
#[derive(Debug)]
pub struct OfflineWorker {
    config: Arc<CacheConfig>,
    populator: Populator,
    reaper: Reaper,
    interceptor: Interceptor,
    last_reap: Mutex<Option<ReapReport>>,
}

impl OfflineWorker {
    pub fn new(config: CacheConfig) -> Self {
        let config = Arc::new(config);
        Self {
            populator: Populator::new(Arc::clone(&config)),
            reaper: Reaper::new(Arc::clone(&config)),
            interceptor: Interceptor::new(Arc::clone(&config)),
            config,
            last_reap: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.interceptor.stats()
    }

    /// Report from the most recent activation.
    pub async fn last_reap(&self) -> Option<ReapReport> {
        self.last_reap.lock().await.clone()
    }
}

#[async_trait]
impl WorkerHandler for OfflineWorker {
    fn version(&self) -> &str {
        &self.config.version
    }

    async fn install(&self, event: &InstallEvent<'_>) -> SwResult<()> {
        event.skip_waiting();
        self.populator.populate(event.platform()).await?;
        Ok(())
    }

    async fn activate(&self, event: &ActivateEvent<'_>) -> SwResult<()> {
        let report = self.reaper.reap(event.platform()).await?;
        *self.last_reap.lock().await = Some(report);
        Ok(())
    }

    async fn fetch(&self, event: FetchEvent<'_>) -> FetchOutcome {
        self.interceptor.handle(event.platform(), &event.request).await
    }
}
