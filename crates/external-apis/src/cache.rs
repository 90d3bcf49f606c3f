// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Caching layer for slowly changing provider reference data
//!
//! Protocol directories and token lists are expensive to fetch and change
//! rarely, so each provider instance keeps one [`MetadataCache`] and refreshes
//! it as a whole once the TTL has elapsed. The first populate is single-flight:
//! callers that arrive while a load is in progress wait for it and share its
//! outcome instead of issuing their own request.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use api_client::ProviderError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, trace, warn};

/// Default time after which the cached mapping is considered stale
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(3600);

/// Time-bounded key/value cache refreshed as a whole
#[derive(Debug)]
pub struct MetadataCache<V> {
    /// Snapshot of the last successful refresh, replaced whole on update
    entries: RwLock<Arc<HashMap<String, V>>>,
    /// When the mapping was last replaced; `None` before the first update
    refreshed_at: RwLock<Option<Instant>>,
    /// Staleness threshold
    ttl: Duration,
    /// Serializes loads and remembers the outcome of the last one
    populate: Mutex<Option<ProviderError>>,
    /// Bumped after every finished load, successful or not
    generation: AtomicU64,
    /// Cache statistics
    stats: DashMap<String, u64>,
}

impl<V: Clone> Default for MetadataCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> MetadataCache<V> {
    /// Create a cache with the default one hour TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_METADATA_TTL)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(Arc::new(HashMap::new())),
            refreshed_at: RwLock::new(None),
            ttl,
            populate: Mutex::new(None),
            generation: AtomicU64::new(0),
            stats: DashMap::new(),
        }
    }

    /// Looks up one entry; a miss is never an error
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.snapshot().get(key) {
            self.increment_stat("cache_hits");
            return Some(value.clone());
        }
        self.increment_stat("cache_misses");
        trace!(key, "metadata cache miss");
        None
    }

    /// Replaces the cached mapping and restarts the TTL
    pub fn update<I>(&self, mapping: I)
    where
        I: IntoIterator<Item = (String, V)>,
    {
        let mapping: HashMap<String, V> = mapping.into_iter().collect();
        let entries = mapping.len();
        *self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(mapping);
        *self
            .refreshed_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.increment_stat("refreshes");

        debug!(
            entries,
            ttl_seconds = self.ttl.as_secs(),
            "metadata cache updated"
        );
    }

    /// True before the first update and once the TTL has elapsed since the last one
    pub fn needs_update(&self) -> bool {
        let refreshed_at = *self
            .refreshed_at
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        refreshed_at.is_none_or(|at| at.elapsed() > self.ttl)
    }

    /// Refreshes the cache through `load` unless it is still fresh
    ///
    /// Concurrent callers coalesce into one in-flight load and all observe
    /// its result, including the same error when it fails. The next call
    /// after a failure tries again.
    ///
    /// # Errors
    ///
    /// Returns the loader's error; the previous mapping, if any, stays in place.
    pub async fn ensure_fresh<F, Fut>(&self, load: F) -> Result<(), ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HashMap<String, V>, ProviderError>>,
    {
        if !self.needs_update() {
            return Ok(());
        }

        let observed = self.generation.load(Ordering::Acquire);
        let mut last_error = self.populate.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            // Another caller finished a load while this one waited.
            self.increment_stat("coalesced_waits");
            return match last_error.as_ref() {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            };
        }
        if !self.needs_update() {
            return Ok(());
        }

        match load().await {
            Ok(mapping) => {
                *last_error = None;
                self.update(mapping);
                info!(entries = self.len(), "metadata cache populated");
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "metadata cache refresh failed");
                *last_error = Some(error.clone());
                self.generation.fetch_add(1, Ordering::AcqRel);
                self.increment_stat("refresh_failures");
                Err(error)
            }
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Drops every entry and forces the next lookup to refresh
    pub fn clear(&self) {
        *self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(HashMap::new());
        *self
            .refreshed_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        debug!("cleared metadata cache");
    }

    /// Get cache statistics
    pub fn get_stats(&self) -> MetadataCacheStats {
        let cache_hits = self.get_stat("cache_hits");
        let cache_misses = self.get_stat("cache_misses");
        let total_requests = cache_hits + cache_misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if total_requests > 0 {
            cache_hits as f64 / total_requests as f64
        } else {
            0.0
        };

        MetadataCacheStats {
            entry_count: self.len(),
            cache_hits,
            cache_misses,
            refreshes: self.get_stat("refreshes"),
            refresh_failures: self.get_stat("refresh_failures"),
            coalesced_waits: self.get_stat("coalesced_waits"),
            hit_rate,
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    /// Current mapping; readers keep their snapshot while an update swaps in the next
    fn snapshot(&self) -> Arc<HashMap<String, V>> {
        Arc::clone(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Increment a statistics counter
    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|v| *v += 1)
            .or_insert(1);
    }

    /// Get a statistics value
    fn get_stat(&self, key: &str) -> u64 {
        self.stats.get(key).map_or(0, |v| *v)
    }
}

/// Cache statistics and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataCacheStats {
    /// Number of cached entries
    pub entry_count: usize,
    /// Cache hit count
    pub cache_hits: u64,
    /// Cache miss count
    pub cache_misses: u64,
    /// Successful refreshes
    pub refreshes: u64,
    /// Failed refresh attempts
    pub refresh_failures: u64,
    /// Callers that shared another caller's in-flight load
    pub coalesced_waits: u64,
    /// Cache hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// TTL in seconds
    pub ttl_seconds: u64,
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn directory() -> HashMap<String, String> {
        HashMap::from([
            ("aave3".to_string(), "Aave V3".to_string()),
            ("uniswap3".to_string(), "Uniswap V3".to_string()),
        ])
    }

    #[test]
    fn needs_update_until_first_update() {
        let cache = MetadataCache::<String>::new();
        assert!(cache.needs_update());
        assert_eq!(cache.get("aave3"), None);

        cache.update(directory());
        assert!(!cache.needs_update());
        assert_eq!(cache.get("aave3").as_deref(), Some("Aave V3"));
        assert_eq!(cache.get("compound"), None);

        let stats = cache.get_stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 2);
        assert_eq!(stats.ttl_seconds, 3600);
    }

    #[tokio::test(start_paused = true)]
    async fn goes_stale_after_ttl() {
        let cache = MetadataCache::<String>::new();
        cache.update(directory());

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(!cache.needs_update());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.needs_update());
        assert_eq!(cache.get("aave3").as_deref(), Some("Aave V3"));
    }

    #[test]
    fn update_replaces_the_whole_mapping() {
        let cache = MetadataCache::<String>::new();
        cache.update(directory());
        cache.update([("curve".to_string(), "Curve".to_string())]);
        assert_eq!(cache.get("aave3"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn readers_never_miss_during_refresh() {
        let cache = Arc::new(MetadataCache::<String>::new());
        cache.update(directory());

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    cache.update(directory());
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    (0..2000)
                        .filter(|_| cache.get("aave3").is_none())
                        .count()
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            assert_eq!(reader.join().unwrap(), 0);
        }
        assert_eq!(cache.get_stats().cache_misses, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_populate_is_single_flight() {
        let cache = Arc::new(MetadataCache::<String>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let callers: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                tokio::spawn(async move {
                    cache
                        .ensure_fresh(|| async move {
                            loads.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(directory())
                        })
                        .await
                })
            })
            .collect();

        for caller in callers {
            assert!(caller.await.unwrap().is_ok());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_stats().refreshes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_share_a_failed_load_and_the_next_call_retries() {
        let cache = Arc::new(MetadataCache::<String>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let callers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                tokio::spawn(async move {
                    cache
                        .ensure_fresh(|| async move {
                            loads.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Err(ProviderError::Gateway {
                                status: Some(503),
                                message: "Service Unavailable".to_string(),
                            })
                        })
                        .await
                })
            })
            .collect();

        for caller in callers {
            assert!(matches!(
                caller.await.unwrap(),
                Err(ProviderError::Gateway { .. })
            ));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.needs_update());

        cache
            .ensure_fresh(|| async { Ok(directory()) })
            .await
            .unwrap();
        assert!(!cache.needs_update());
        assert_eq!(cache.get_stats().refresh_failures, 1);
    }

    #[tokio::test]
    async fn fresh_cache_skips_the_loader() {
        let cache = MetadataCache::<String>::new();
        cache.update(directory());
        cache
            .ensure_fresh(|| async { Err(ProviderError::config("loader must not run")) })
            .await
            .unwrap();
    }
}
