//! Resolution cache for effective permission sets
//!
//! Memoizes closures keyed by role. Entries carry no TTL: they stay valid
//! until a mutation invalidates them, and the engine invalidates every
//! ancestor-or-self of the mutated role while holding its write lock.

use crate::graph::PermissionSet;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rolegraph_core::RoleId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store resolved closures at all
    pub enabled: bool,

    /// Maximum number of cached roles
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 10_000,
        }
    }
}

/// Thread-safe cache of resolved closures
///
/// Values are shared immutable snapshots; callers never mutate a returned set.
pub struct ResolutionCache {
    /// Resolved closures by role
    entries: DashMap<RoleId, Arc<PermissionSet>>,

    /// Cache configuration
    config: CacheConfig,

    /// Slots taken, reserved before a new entry is inserted
    occupied: AtomicUsize,

    /// Cache statistics
    stats: DashMap<&'static str, usize>,
}

impl ResolutionCache {
    /// Create a new resolution cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            occupied: AtomicUsize::new(0),
            stats: DashMap::new(),
        }
    }

    /// Whether the cache stores anything
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.config.capacity > 0
    }

    /// Get the cached closure of a role
    pub fn get(&self, role: RoleId) -> Option<Arc<PermissionSet>> {
        if !self.is_enabled() {
            return None;
        }

        match self.entries.get(&role) {
            Some(entry) => {
                self.increment_stat("hits");
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.increment_stat("misses");
                None
            }
        }
    }

    /// Store a freshly computed closure
    ///
    /// Returns `false` when caching is disabled or the cache is full; the
    /// caller still serves the computed value. Concurrent puts never take the
    /// cache past its capacity.
    pub fn put(&self, role: RoleId, permissions: Arc<PermissionSet>) -> bool {
        if !self.is_enabled() {
            return false;
        }

        match self.entries.entry(role) {
            Entry::Occupied(mut entry) => {
                entry.insert(permissions);
                true
            }
            Entry::Vacant(entry) => {
                if !self.reserve_slot() {
                    self.increment_stat("rejected");
                    return false;
                }
                entry.insert(permissions);
                true
            }
        }
    }

    fn reserve_slot(&self) -> bool {
        let capacity = self.config.capacity;
        self.occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| {
                (taken < capacity).then_some(taken + 1)
            })
            .is_ok()
    }

    /// Drop the entries of the given roles, returning how many were present
    pub fn invalidate<I>(&self, roles: I) -> usize
    where
        I: IntoIterator<Item = RoleId>,
    {
        let removed = roles
            .into_iter()
            .filter(|role| self.entries.remove(role).is_some())
            .count();

        if removed > 0 {
            self.occupied.fetch_sub(removed, Ordering::AcqRel);
            self.add_stat("invalidations", removed);
        }
        removed
    }

    /// Clear the entire cache
    pub fn clear(&self) {
        self.entries.clear();
        self.occupied.store(0, Ordering::Release);
        self.stats.clear();
    }

    /// Number of cached roles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            invalidations: self.get_stat("invalidations"),
            rejected: self.get_stat("rejected"),
            entries: self.entries.len(),
            capacity: self.config.capacity,
        }
    }

    fn increment_stat(&self, key: &'static str) {
        self.add_stat(key, 1);
    }

    fn add_stat(&self, key: &'static str, amount: usize) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += amount)
            .or_insert(amount);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
    /// Puts refused because the cache was full
    pub rejected: usize,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
