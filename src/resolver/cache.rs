//! Domain cache
//!
//! Key/value storage with optional per-entry expiry. Expired entries are
//! dropped lazily when read; there is no background sweeper.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::trace;

/// Storage used by the resolver for fetched pages
pub trait CacheProvider<V>: Send + Sync {
    /// Returns the live value under `key`
    fn get(&self, key: &str) -> Option<V>;

    /// Stores `value`; `None` ttl never expires
    fn set(&self, key: &str, value: V, ttl: Option<Duration>);

    fn delete(&self, key: &str);

    /// Deletes every key starting with `prefix`, returning how many
    fn remove_prefix(&self, prefix: &str) -> usize;

    fn clear(&self);

    fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses, expired entries included
    pub misses: u64,
    /// Number of entries dropped on expiry
    pub evictions: u64,
}

impl CacheStats {
    /// Hit ratio in [0, 1]; zero before any lookup
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
}

/// Process-local cache behind a read/write lock.
///
/// A poisoned lock is recovered: entries are plain data and stay consistent.
#[derive(Debug)]
pub struct InMemoryCache<V> {
    inner: RwLock<Inner<V>>,
}

impl<V> InMemoryCache<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<V>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<V>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn stats(&self) -> CacheStats {
        self.read().stats
    }

    /// Number of stored entries, expired ones not yet dropped included
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }
}

impl<V> Default for InMemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheProvider<V> for InMemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.write();

        let lookup = inner
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => {
                inner.stats.hits += 1;
                return Some(value);
            }
            Some(None) => {
                inner.entries.remove(key);
                inner.stats.evictions += 1;
                trace!(key, "cache entry expired");
            }
            None => {}
        }
        inner.stats.misses += 1;
        None
    }

    fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.write()
            .entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn delete(&self, key: &str) {
        self.write().entries.remove(key);
    }

    fn remove_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.write();
        let before = inner.entries.len();
        inner.entries.retain(|k, _| !k.starts_with(prefix));
        before - inner.entries.len()
    }

    fn clear(&self) {
        self.write().entries.clear();
    }

    fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        self.read()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }
}
