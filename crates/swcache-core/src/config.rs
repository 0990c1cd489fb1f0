//! Cache worker configuration.
//!
//! A [`CacheConfig`] is built once when the worker starts and shared by
//! every component. Nothing here is read from the environment; the
//! deployment constants live in [`CacheConfig::site`].

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SwError, SwResult};

/// Deployment generation tag. Changes on every deploy.
pub const VERSION: &str = "caa7-5176-e7fe";

/// URL substrings that must never be intercepted or cached.
pub const EXCLUDED_URLS: &[&str] = &[
    "admin",
    ".netlify",
    "https://identity.netlify.com/v1/netlify-identity-widget.js",
    "https://unpkg.com/netlify-cms@^2.9.3/dist/netlify-cms.js",
    "https://www.google-analytics.com/",
    "https://www.google-analytics.com/analytics.js",
];

/// Paths fetched and stored when the worker installs.
pub const PRE_CACHE_URLS: &[&str] = &[
    "/",
    "/fonts/gallaudetregular-webfont.woff2",
    "/codeart/",
    "/installations/",
    "/about/",
    "/imprint/",
    "/images/favicon.ico",
    "/js/index.min.js",
    "/js/three.min.js",
    "/js/typeface.json",
    "/js/intro-canvas.min.js",
    "/images/about/ilithya.jpg",
    "/images/codeart/donut.gif",
    "/images/codeart/shape.gif",
    "/images/codeart/crystals.gif",
    "/images/codeart/ribbon.gif",
    "/images/codeart/pattern.gif",
    "/images/codeart/spiderweb.gif",
    "/images/codeart/geometry.gif",
    "/images/codeart/shroom.gif",
    "/images/codeart/butterfly.gif",
];

/// Hosts whose requests bypass the worker entirely.
pub const IGNORED_HOSTS: &[&str] = &["localhost", "unpkg.com"];

/// Cache worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Scope the worker is registered for. Relative pre-cache paths
    /// resolve against it.
    pub scope: Url,

    /// Deployment generation tag.
    pub version: String,

    /// Substrings; a request URL containing any of them is not intercepted.
    pub excluded_urls: Vec<String>,

    /// Exact hostnames that are not intercepted.
    pub ignored_hosts: Vec<String>,

    /// Paths or absolute URLs stored at install time.
    pub precache_urls: Vec<String>,
}

impl CacheConfig {
    /// The site's deployment configuration, scoped to `scope`.
    pub fn site(scope: Url) -> Self {
        Self {
            scope,
            version: VERSION.to_string(),
            excluded_urls: to_owned(EXCLUDED_URLS),
            ignored_hosts: to_owned(IGNORED_HOSTS),
            precache_urls: to_owned(PRE_CACHE_URLS),
        }
    }

    /// An empty configuration: nothing excluded, nothing pre-cached.
    pub fn empty(scope: Url, version: impl Into<String>) -> Self {
        Self {
            scope,
            version: version.into(),
            excluded_urls: Vec::new(),
            ignored_hosts: Vec::new(),
            precache_urls: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_precache_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excluded_urls<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_urls = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ignored_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Cache store names for the current generation.
    pub fn keys(&self) -> CacheKeys {
        CacheKeys::for_version(&self.version)
    }

    /// Resolve every pre-cache entry against the scope, in list order.
    pub fn resolve_precache_urls(&self) -> SwResult<Vec<Url>> {
        self.precache_urls
            .iter()
            .map(|path| self.scope.join(path).map_err(SwError::from))
            .collect()
    }

    /// Whether requests to `host` bypass the worker.
    pub fn is_ignored_host(&self, host: &str) -> bool {
        self.ignored_hosts.iter().any(|h| h == host)
    }

    /// The first excluded pattern contained in `url`, if any.
    pub fn excluded_pattern(&self, url: &str) -> Option<&str> {
        self.excluded_urls
            .iter()
            .map(String::as_str)
            .find(|pattern| url.contains(pattern))
    }
}

/// The two store names belonging to one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKeys {
    /// Curated assets stored at install.
    pub precache: String,
    /// Responses stored as they are fetched.
    pub runtime: String,
}

impl CacheKeys {
    pub fn for_version(version: &str) -> Self {
        Self {
            precache: format!("precache-{version}"),
            runtime: format!("runtime-{version}"),
        }
    }

    /// Whether `name` belongs to this generation.
    pub fn contains(&self, name: &str) -> bool {
        self.precache == name || self.runtime == name
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
