//! Activation-time removal of superseded cache generations.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CacheConfig, CacheKeys};
use crate::error::SwResult;
use crate::platform::{CacheStorage, Platform};

/// Outcome of one reaping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    /// Stores that were removed.
    pub deleted: Vec<String>,
    /// Stores whose removal failed; left for the next activation.
    pub failed: Vec<String>,
    /// Clients now controlled by this version.
    pub claimed: usize,
}

impl ReapReport {
    /// Whether nothing was attempted.
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty() && self.failed.is_empty()
    }
}

/// Store names not belonging to the generation `keys`, in storage order.
pub async fn stale_names(caches: &dyn CacheStorage, keys: &CacheKeys) -> SwResult<Vec<String>> {
    Ok(caches
        .keys()
        .await?
        .into_iter()
        .filter(|name| !keys.contains(name))
        .collect())
}

/// Delete every store outside `keys`. Deletions run concurrently and a
/// failed one does not affect the others.
pub async fn delete_stale(caches: &dyn CacheStorage, keys: &CacheKeys) -> SwResult<ReapReport> {
    let stale = stale_names(caches, keys).await?;
    let mut report = ReapReport::default();
    if stale.is_empty() {
        debug!("No stale cache stores");
        return Ok(report);
    }

    let results = join_all(stale.iter().map(|name| caches.delete(name))).await;
    for (name, result) in stale.into_iter().zip(results) {
        match result {
            Ok(_) => {
                debug!(cache = %name, "Deleted stale cache store");
                report.deleted.push(name);
            }
            Err(e) => {
                warn!(cache = %name, error = %e, "Failed to delete stale cache store");
                report.failed.push(name);
            }
        }
    }
    Ok(report)
}

/// Garbage-collects old generations, then claims open clients.
#[derive(Debug, Clone)]
pub struct Reaper {
    config: Arc<CacheConfig>,
}

impl Reaper {
    pub fn new(config: Arc<CacheConfig>) -> Self {
        Self { config }
    }

    pub async fn reap(&self, platform: &dyn Platform) -> SwResult<ReapReport> {
        let keys = self.config.keys();
        let mut report = delete_stale(platform.caches(), &keys).await?;
        report.claimed = platform.clients().claim(&self.config.version).await?;

        info!(
            version = %self.config.version,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            claimed = report.claimed,
            "Stale generations reaped"
        );
        Ok(report)
    }
}
