//! A single process-local TTL cache
//!
//! Values are stored behind `Arc` and handed out shared; callers never get a
//! mutable view of a cached value. Expiry is checked on every read, and a
//! background sweep (see [`crate::CacheService::start`]) reclaims entries
//! nobody reads again.

use parking_lot::RwLock;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use vox_core::config::CacheTierConfig;

type Shared = Arc<dyn Any + Send + Sync>;

struct Entry {
    value: Shared,
    expires_at: Instant,
}

impl Entry {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Hit/miss counters and size of one cache
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub name: &'static str,
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
    /// Hits over lookups, 0.0 before the first lookup
    pub hit_rate: f64,
}

/// TTL-bounded key-value cache
pub struct TtlCache {
    name: &'static str,
    ttl: Duration,
    max_keys: usize,
    sweep_period: Duration,
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TtlCache {
    /// Create a cache
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in logs and stats
    /// * `ttl` - Lifetime of every entry
    /// * `max_keys` - Capacity; entries closest to expiry are evicted in batches when full
    /// * `sweep_period` - Interval of the background sweep
    pub fn new(name: &'static str, ttl: Duration, max_keys: usize, sweep_period: Duration) -> Self {
        Self {
            name,
            ttl,
            max_keys: max_keys.max(1),
            sweep_period,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(name: &'static str, config: &CacheTierConfig) -> Self {
        Self::new(
            name,
            Duration::from_secs(config.ttl_secs),
            config.max_keys,
            Duration::from_secs(config.check_period_secs.max(1)),
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn sweep_period(&self) -> Duration {
        self.sweep_period
    }

    /// Look up a live entry of type `T`
    ///
    /// An expired entry, or one stored with another type, counts as a miss.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let now = Instant::now();

        let found = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => Some(Arc::clone(&entry.value)),
                Some(_) => None,
                None => {
                    self.record_miss(key);
                    return None;
                }
            }
        };

        match found.and_then(|value| value.downcast::<T>().ok()) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(cache = self.name, key = %key, "Cache HIT");
                Some(value)
            }
            None => {
                self.remove_if_expired(key, now);
                self.record_miss(key);
                None
            }
        }
    }

    /// Store a value, replacing any existing entry, and return the shared handle
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.set_shared(key, Arc::clone(&value));
        value
    }

    /// Store an already shared value
    ///
    /// A full cache first drops expired entries, then the tenth of its
    /// capacity closest to expiry, so the scan runs once per batch of
    /// inserts rather than on each one.
    pub fn set_shared<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.max_keys {
            entries.retain(|_, entry| !entry.is_expired(now));
            if entries.len() >= self.max_keys {
                let batch = self.eviction_batch();
                let mut by_expiry: Vec<(Instant, String)> = entries
                    .iter()
                    .map(|(k, entry)| (entry.expires_at, k.clone()))
                    .collect();
                by_expiry.select_nth_unstable(batch - 1);
                for (_, oldest) in by_expiry.into_iter().take(batch) {
                    entries.remove(&oldest);
                }
                debug!(cache = self.name, evicted = batch, "Cache full, evicting");
            }
        }

        trace!(cache = self.name, key = %key, ttl_secs = self.ttl.as_secs(), "Cache SET");
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Look up a live entry without touching the hit/miss counters
    pub fn peek<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let now = Instant::now();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| Arc::clone(&entry.value).downcast::<T>().ok())
    }

    /// Remove a key, returning whether it was present
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            debug!(cache = self.name, key = %key, "Cache DEL");
        }
        removed
    }

    /// Remove every key starting with `prefix`, returning how many were removed
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(cache = self.name, prefix = %prefix, removed, "Cache DEL by prefix");
        }
        removed
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Drop every entry and reset the counters
    pub fn flush(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            name: self.name,
            keys: self.len(),
            hits,
            misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }

    #[inline]
    fn eviction_batch(&self) -> usize {
        (self.max_keys / 10).max(1)
    }

    fn record_miss(&self, key: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(cache = self.name, key = %key, "Cache MISS");
    }

    fn remove_if_expired(&self, key: &str, now: Instant) {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
    }
}
