//! Rendered page cache.
//!
//! A hit inside the validity window returns the stored body verbatim, even if
//! the data behind it changed since. Nothing invalidates entries except expiry
//! and [`PageCache::clear`].

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use yatube_core::ports::{Cache, CacheError};

/// Namespace every page key lives under.
const KEY_PREFIX: &str = "page:";

/// How request URLs map to cache keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageCacheKeyStrategy {
    /// Path only: the first rendered page is served for every query string.
    Path,
    /// Path plus the normalized (sorted) query string.
    #[default]
    PathAndQuery,
}

impl FromStr for PageCacheKeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => Ok(Self::Path),
            "path_and_query" | "path-and-query" => Ok(Self::PathAndQuery),
            other => Err(format!("unknown page cache key strategy '{other}'")),
        }
    }
}

/// A page body and whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub body: String,
    pub hit: bool,
}

#[derive(Clone)]
pub struct PageCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
    strategy: PageCacheKeyStrategy,
}

impl PageCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration, strategy: PageCacheKeyStrategy) -> Self {
        Self {
            cache,
            ttl,
            strategy,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for a request path and raw query string.
    pub fn key(&self, path: &str, query: &str) -> String {
        let path = if path.is_empty() { "/" } else { path };
        match self.strategy {
            PageCacheKeyStrategy::Path => format!("{KEY_PREFIX}{path}"),
            PageCacheKeyStrategy::PathAndQuery => {
                let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .filter(|(k, _)| !k.is_empty())
                    .collect();
                if pairs.is_empty() {
                    return format!("{KEY_PREFIX}{path}");
                }
                pairs.sort();
                let normalized = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                format!("{KEY_PREFIX}{path}?{normalized}")
            }
        }
    }

    /// Return the cached body for this URL, or render, store and return a fresh one.
    ///
    /// Failing to store the fresh body is logged and does not fail the request.
    /// A zero TTL disables caching: every request renders.
    pub async fn get_or_render<F, Fut, E>(
        &self,
        path: &str,
        query: &str,
        render: F,
    ) -> Result<CachedPage, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if self.ttl.is_zero() {
            let body = render().await?;
            return Ok(CachedPage { body, hit: false });
        }

        let key = self.key(path, query);

        if let Some(body) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "Page cache hit");
            return Ok(CachedPage { body, hit: true });
        }

        let body = render().await?;
        if let Err(e) = self.cache.set(&key, &body, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %e, "Failed to store rendered page");
        } else {
            tracing::debug!(key = %key, ttl_secs = self.ttl.as_secs(), "Page cached");
        }

        Ok(CachedPage { body, hit: false })
    }

    /// Drop every cached page.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let removed = self.cache.delete_prefix(KEY_PREFIX).await?;
        tracing::info!(removed, "Page cache cleared");
        Ok(removed)
    }
}
