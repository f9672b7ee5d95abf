//! Caching decorator for label resolution
//!
//! Folder directories change rarely while rule batches re-resolve the same
//! handful of view names, so resolved references are cached with TTL and
//! idle expiry. Only positive results are cached: a miss must stay
//! re-checkable so a folder created after the miss starts resolving without
//! a restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::{FolderRef, LabelResolver};

/// Resolver cache configuration
pub struct ResolverCacheConfig {
    /// Maximum number of folder references to cache
    pub max_capacity: u64,

    /// Time-to-live for cached references (in seconds)
    pub ttl_secs: u64,

    /// Time-to-idle for cached references (in seconds)
    pub tti_secs: u64,
}

impl Default for ResolverCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1000,
            ttl_secs: 1800,
            tti_secs: 600,
        }
    }
}

/// Caching wrapper over any [`LabelResolver`].
#[derive(Clone)]
pub struct CachingResolver {
    inner: Arc<dyn LabelResolver>,
    cache: Arc<Cache<(String, String), FolderRef>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CachingResolver {
    /// Wrap a resolver with the default cache configuration
    pub fn new(inner: Arc<dyn LabelResolver>) -> Self {
        Self::with_config(inner, ResolverCacheConfig::default())
    }

    /// Wrap a resolver with a custom cache configuration
    pub fn with_config(inner: Arc<dyn LabelResolver>, config: ResolverCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .time_to_idle(Duration::from_secs(config.tti_secs))
            .build();

        Self {
            inner,
            cache: Arc::new(cache),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cache statistics: (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Drop every cached reference
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl LabelResolver for CachingResolver {
    async fn resolve(&self, user_id: &str, view_name: &str) -> Option<FolderRef> {
        let key = (user_id.to_string(), view_name.to_lowercase());
        if let Some(folder) = self.cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(folder);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let resolved = self.inner.resolve(user_id, view_name).await;
        if let Some(folder) = &resolved {
            self.cache.insert(key, folder.clone()).await;
        }
        resolved
    }
}
