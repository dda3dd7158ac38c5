//! Process-wide cache of generated values.
//!
//! Entries are keyed by `(key_prefix, generator kind, params)`. An entry moves
//! through three ages: fresh (served as is), stale (older than
//! `ttl - refresh_before`; served once more while a new value replaces it) and
//! expired (regenerated synchronously). Time is read from `tokio::time` so
//! paused-clock tests can drive expiry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::domain::dependency::{CacheConfig, GeneratorKind};
use crate::engine::generator::GeneratorError;
use crate::util::sort::canonical_json;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    created_at: Instant,
    ttl: Duration,
}

enum Lookup {
    Fresh(Value),
    Stale(Value),
    Miss,
}

/// Counters since construction or the last `clear`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Debug)]
pub struct GeneratorCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
    counters: Counters,
}

impl GeneratorCache {
    /// `default_ttl` applies to descriptors that leave `ttl_ms` unset.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            counters: Counters::default(),
        }
    }

    pub fn key(key_prefix: &str, kind: GeneratorKind, params: &Map<String, Value>) -> String {
        let params = canonical_json(&Value::Object(params.clone()));
        format!("{key_prefix}:{kind}:{params}")
    }

    /// Returns the cached value for this descriptor, calling `generate` on a
    /// miss, on expiry, or to refresh a stale entry.
    pub fn get_or_generate<F>(
        &self,
        config: &CacheConfig,
        kind: GeneratorKind,
        params: &Map<String, Value>,
        generate: F,
    ) -> Result<Value, GeneratorError>
    where
        F: FnOnce() -> Result<Value, GeneratorError>,
    {
        let key = Self::key(&config.key_prefix, kind, params);
        let ttl = config.ttl_or(self.default_ttl);

        match self.lookup(&key, config.refresh_before()) {
            Lookup::Fresh(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(%key, "generator cache hit");
                Ok(value)
            }
            Lookup::Stale(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                debug!(%key, "generator cache entry near expiry; refreshing");
                match generate() {
                    Ok(fresh) => self.store(key, fresh, ttl),
                    Err(error) => warn!(%key, %error, "refresh failed; keeping stale entry"),
                }
                Ok(value)
            }
            Lookup::Miss => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(%key, "generator cache miss");
                let value = generate()?;
                self.store(key, value.clone(), ttl);
                Ok(value)
            }
        }
    }

    fn lookup(&self, key: &str, refresh_before: Duration) -> Lookup {
        let now = Instant::now();
        let found = self.entries.get(key).map(|entry| entry.clone());
        let Some(entry) = found else {
            return Lookup::Miss;
        };

        let age = now.saturating_duration_since(entry.created_at);
        if age >= entry.ttl {
            if self
                .entries
                .remove_if(key, |_, current| current.created_at == entry.created_at)
                .is_some()
            {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            }
            return Lookup::Miss;
        }
        if !refresh_before.is_zero() && age >= entry.ttl.saturating_sub(refresh_before) {
            return Lookup::Stale(entry.value);
        }
        Lookup::Fresh(entry.value)
    }

    fn store(&self, key: String, value: Value, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.created_at) < entry.ttl);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.counters
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "evicted expired generator cache entries");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
        for counter in [
            &self.counters.hits,
            &self.counters.misses,
            &self.counters.refreshes,
            &self.counters.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    /// Starts a background task that calls `evict_expired` every `interval`.
    ///
    /// The task holds a weak reference and ends on its own once the cache is
    /// dropped. Must be called inside a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let cache: Weak<Self> = Arc::downgrade(self);
        let period = interval.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.evict_expired();
            }
        });
        SweeperHandle {
            handle: Some(handle),
        }
    }
}

/// Owns the sweeper task; stopping or dropping it aborts the sweep loop.
#[derive(Debug)]
pub struct SweeperHandle {
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn shutdown(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
