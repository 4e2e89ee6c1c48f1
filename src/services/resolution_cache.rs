//! Process-wide resolution cache
//!
//! Maps a normalized symbol to its last resolution outcome, including the
//! `Unresolved` marker so futile lookups are not repeated. Entries never
//! expire; they leave only through `invalidate`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::ResolvedIcon;

/// Storage seam for resolution outcomes
///
/// Keys are normalized symbols (see `Symbol::key`). Each write replaces the
/// mapped value atomically and is visible to every holder of the cache.
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<ResolvedIcon>;

    async fn set(&self, key: &str, icon: ResolvedIcon);

    /// Returns the removed entry, if there was one
    async fn invalidate(&self, key: &str) -> Option<ResolvedIcon>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn snapshot(&self) -> HashMap<String, ResolvedIcon>;
}

/// Counters for cache diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub invalidations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
}

/// In-memory cache; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolutionCache {
    entries: Arc<RwLock<HashMap<String, ResolvedIcon>>>,
    counters: Arc<Counters>,
}

impl InMemoryResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl ResolutionCache for InMemoryResolutionCache {
    async fn get(&self, key: &str) -> Option<ResolvedIcon> {
        let entry = self.entries.read().await.get(key).cloned();
        let counter = if entry.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        entry
    }

    async fn set(&self, key: &str, icon: ResolvedIcon) {
        debug!("Caching {} for {}", icon.kind(), key);
        self.entries.write().await.insert(key.to_string(), icon);
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
    }

    async fn invalidate(&self, key: &str) -> Option<ResolvedIcon> {
        let removed = self.entries.write().await.remove(key);
        if removed.is_some() {
            debug!("Invalidated cached icon for {}", key);
            self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn snapshot(&self) -> HashMap<String, ResolvedIcon> {
        self.entries.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_invalidate() {
        let cache = InMemoryResolutionCache::new();
        assert!(cache.get("ETH").await.is_none());
        assert!(cache.is_empty().await);

        cache.set("ETH", ResolvedIcon::remote("https://x/eth.svg")).await;
        assert_eq!(
            cache.get("ETH").await,
            Some(ResolvedIcon::remote("https://x/eth.svg"))
        );

        let removed = cache.invalidate("ETH").await;
        assert_eq!(removed, Some(ResolvedIcon::remote("https://x/eth.svg")));
        assert!(cache.get("ETH").await.is_none());
        assert!(cache.invalidate("ETH").await.is_none());
    }

    #[tokio::test]
    async fn test_unresolved_marker_is_an_entry() {
        let cache = InMemoryResolutionCache::new();
        cache.set("XYZ", ResolvedIcon::Unresolved).await;
        assert_eq!(cache.get("XYZ").await, Some(ResolvedIcon::Unresolved));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_set_replaces_value() {
        let cache = InMemoryResolutionCache::new();
        cache.set("ETH", ResolvedIcon::Unresolved).await;
        cache.set("ETH", ResolvedIcon::remote("https://x/eth.svg")).await;
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("ETH").await.unwrap().is_resolved());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache = InMemoryResolutionCache::new();
        let other = cache.clone();
        other.set("BTC", ResolvedIcon::remote("https://x/btc.svg")).await;
        assert!(cache.get("BTC").await.is_some());
        assert_eq!(cache.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = InMemoryResolutionCache::new();
        cache.get("ETH").await;
        cache.set("ETH", ResolvedIcon::Unresolved).await;
        cache.get("ETH").await;
        cache.invalidate("ETH").await;

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                writes: 1,
                invalidations: 1,
            }
        );
    }
}
