//! Bounded memoization shared across threads.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{Fingerprint, Location};

/// Cache key: year, location rounded to 1e-4 degrees, configuration and
/// whether uncertainty is included.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CacheKey {
    pub year: i32,
    pub latitude: i64,
    pub longitude: i64,
    pub fingerprint: Fingerprint,
    pub with_uncertainty: bool,
}

impl CacheKey {
    pub fn new(year: i32, location: &Location, fingerprint: Fingerprint) -> Self {
        Self {
            year,
            latitude: (location.latitude * 1e4).round() as i64,
            longitude: (location.longitude * 1e4).round() as i64,
            fingerprint,
            with_uncertainty: false,
        }
    }
    pub fn with_uncertainty(mut self, included: bool) -> Self {
        self.with_uncertainty = included;
        self
    }
}

/// Hit and miss counters of a [`BoundedCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Inner<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    hits: u64,
    misses: u64,
}

/// Map holding at most `capacity` entries; inserting past the bound evicts
/// the oldest inserted entry.
///
/// All operations take a short internal lock, so a cache can sit behind a
/// shared reference.
pub struct BoundedCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    // A panic while holding the lock cannot leave the map and queue out of
    // step, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let found = inner.map.get(key).cloned();
        match found {
            Some(_) => inner.hits += 1,
            None => inner.misses += 1,
        }
        found
    }

    /// Inserts `value`, replacing any entry under `key` without changing its
    /// age.
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.lock();
        if inner.map.insert(key.clone(), value).is_some() {
            return;
        }
        inner.order.push_back(key);
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.map.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

impl<K, V> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
