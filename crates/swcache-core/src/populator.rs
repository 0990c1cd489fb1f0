//! Install-time population of the pre-cache store.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CacheConfig;
use crate::error::{SwError, SwResult};
use crate::request::Request;
use crate::platform::{Cache, Network, Platform};

/// Fetch every URL and store all responses in `cache`, or store nothing.
///
/// Fetches run concurrently. A transport failure or a non-2xx status for
/// any URL fails the whole batch before anything is written.
pub async fn add_all(cache: &dyn Cache, network: &dyn Network, urls: &[Url]) -> SwResult<usize> {
    let fetches = urls.iter().map(|url| async move {
        let request = Request::get(url.clone());
        let response = network.fetch(&request).await?;
        if !response.ok() {
            return Err(SwError::BadStatus {
                url: url.to_string(),
                status: response.status.as_u16(),
            });
        }
        debug!(url = %url, status = %response.status, "Pre-cache fetch complete");
        Ok::<_, SwError>((request, response))
    });

    let pairs = try_join_all(fetches).await?;
    let count = pairs.len();
    cache.put_all(pairs).await?;
    Ok(count)
}

/// Fills the current generation's pre-cache store.
#[derive(Debug, Clone)]
pub struct Populator {
    config: Arc<CacheConfig>,
}

impl Populator {
    pub fn new(config: Arc<CacheConfig>) -> Self {
        Self { config }
    }

    /// Open the pre-cache store and add every configured URL.
    pub async fn populate(&self, platform: &dyn Platform) -> SwResult<usize> {
        let cache_name = self.config.keys().precache;
        let urls = self.config.resolve_precache_urls()?;
        // The store exists from here on, even if population fails below.
        let cache = platform.caches().open(&cache_name).await?;

        match add_all(cache.as_ref(), platform.network(), &urls).await {
            Ok(count) => {
                info!(cache = %cache_name, count, "Pre-cache populated");
                Ok(count)
            }
            Err(e) => {
                warn!(cache = %cache_name, error = %e, "Pre-cache population failed");
                Err(e)
            }
        }
    }
}
