// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command result caches.
//!
//! ```text
//! CacheManager
//!   cache::<K, V>("scm.cache.cmd.log") ---> Arc<MemoryCache<K, V>>
//!                                             moka::sync::Cache
//!                                             max_entries, optional TTL
//!                                             hit / miss counters
//!
//! RepositoryCacheKey::involves(repo_id)
//!   --> RepositoryScopedCache::clear_repository(repo_id)   (CacheClearHook)
//! ```
//!
//! Concurrent misses for the same key may both reach the backend; the second
//! `put` overwrites the first with an equal value.

pub mod clear;

pub use clear::CacheClearHook;


use std::any::Any;
use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::notification::RemovalCause;
use tracing::debug;

use crate::error::{ScmError, ScmResult};

/// Generic key/value cache.
pub trait CacheStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    fn put(&self, key: K, value: V);

    fn remove(&self, key: &K) -> Option<V>;

    /// Remove every entry whose key matches; returns the number removed.
    fn remove_where(&self, predicate: &dyn Fn(&K) -> bool) -> usize;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache keys that belong to a single repository.
pub trait RepositoryCacheKey {
    fn repository_id(&self) -> &str;

    fn involves(&self, repository_id: &str) -> bool {
        self.repository_id() == repository_id
    }
}

/// A cache whose entries can be dropped per repository.
pub trait RepositoryScopedCache: Send + Sync {
    fn name(&self) -> &str;

    /// Remove every entry of `repository_id`; returns the number removed.
    fn clear_repository(&self, repository_id: &str) -> usize;
}

/// Capacity and lifetime of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    max_entries: usize,
    time_to_live: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            time_to_live: None,
        }
    }
}

impl CacheSettings {
    #[must_use]
    pub const fn new(max_entries: usize, time_to_live: Option<Duration>) -> Self {
        Self {
            max_entries,
            time_to_live,
        }
    }

    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    #[must_use]
    pub const fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live
    }
}

/// Hit and miss counters of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// In-memory cache bounded by entry count with optional time-to-live.
pub struct MemoryCache<K, V> {
    name: String,
    cache: moka::sync::Cache<K, V>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> std::fmt::Debug for MemoryCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("name", &self.name)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish_non_exhaustive()
    }
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, settings: CacheSettings) -> Self {
        let name = name.into();
        let listener_name = name.clone();
        let mut builder = moka::sync::Cache::builder()
            .max_capacity(settings.max_entries.max(1) as u64)
            .eviction_listener(move |_key, _value, cause: RemovalCause| {
                if cause.was_evicted() {
                    debug!(cache = %listener_name, ?cause, "evicted cache entry");
                }
            });
        if let Some(ttl) = settings.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        Self {
            name,
            cache: builder.build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<K, V> CacheStore<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let value = self.cache.get(key);
        let counter = if value.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    fn put(&self, key: K, value: V) {
        self.cache.insert(key, value);
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.cache.remove(key)
    }

    fn remove_where(&self, predicate: &dyn Fn(&K) -> bool) -> usize {
        let matching: Vec<Arc<K>> = self
            .cache
            .iter()
            .filter_map(|(key, _)| predicate(&*key).then_some(key))
            .collect();
        let mut removed = 0;
        for key in matching {
            if self.cache.remove(&*key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        usize::try_from(self.cache.entry_count()).unwrap_or(usize::MAX)
    }
}

impl<K, V> RepositoryScopedCache for MemoryCache<K, V>
where
    K: RepositoryCacheKey + Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn clear_repository(&self, repository_id: &str) -> usize {
        let removed = self.remove_where(&|key: &K| key.involves(repository_id));
        if removed > 0 {
            debug!(
                cache = %self.name,
                repository = repository_id,
                removed,
                "cleared cache entries"
            );
        }
        removed
    }
}

/// Type-erased view of a named cache.
trait ManagedCache: Send + Sync {
    fn clear(&self);
    fn stats(&self) -> CacheStats;
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<K, V> ManagedCache for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clear(&self) {
        CacheStore::clear(self);
    }

    fn stats(&self) -> CacheStats {
        Self::stats(self)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Registry of named caches sharing one set of defaults.
pub struct CacheManager {
    defaults: CacheSettings,
    caches: Mutex<BTreeMap<String, Arc<dyn ManagedCache>>>,
}

impl CacheManager {
    #[must_use]
    pub fn new(defaults: CacheSettings) -> Self {
        Self {
            defaults,
            caches: Mutex::new(BTreeMap::new()),
        }
    }

    /// The cache registered under `name`, created on first use.
    ///
    /// # Errors
    ///
    /// Fails if `name` was first requested with different key or value types.
    pub fn cache<K, V>(&self, name: &str) -> ScmResult<Arc<MemoryCache<K, V>>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = caches.get(name) {
            return Arc::clone(existing)
                .as_any()
                .downcast::<MemoryCache<K, V>>()
                .map_err(|_| {
                    ScmError::other(format!("cache '{name}' exists with different types"))
                });
        }

        debug!(
            cache = name,
            max_entries = self.defaults.max_entries,
            ttl = ?self.defaults.time_to_live,
            "creating cache"
        );
        let cache = Arc::new(MemoryCache::new(name, self.defaults));
        caches.insert(name.to_string(), Arc::clone(&cache) as Arc<dyn ManagedCache>);
        Ok(cache)
    }

    /// Names of all caches created so far.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Statistics per cache name.
    #[must_use]
    pub fn stats(&self) -> BTreeMap<String, CacheStats> {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, cache)| (name.clone(), cache.stats()))
            .collect()
    }

    pub fn clear_all(&self) {
        for cache in self
            .caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            cache.clear();
        }
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
