//! Cache port.
//!
//! The formatter and the engine memoize results through [`CacheStore`]. Entries
//! are never authoritative: a miss only means recomputation, and concurrent
//! writers of the same key store identical values, so last-write-wins is fine.
//!
//! [`InMemoryCache`] is the default store. [`NoopCache`] disables caching,
//! which is useful for measuring uncached behaviour in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Key-value store with per-entry TTL.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String, ttl: Duration);

    fn remove(&self, key: &str);

    /// Drops every entry.
    fn clear(&self);
}

#[derive(Debug)]
struct Entry {
    value: String,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Hit/miss counters for an [`InMemoryCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Process-local cache backed by a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner()).len();
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Removes expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|_, entry| entry.is_live(now));
    }
}

impl CacheStore for InMemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key, "cache hit");
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), Entry { value, expires_at });
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// A store that never retains anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;

impl CacheStore for NoopCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String, _ttl: Duration) {}

    fn remove(&self, _key: &str) {}

    fn clear(&self) {}
}

/// Deterministic cache key for any serializable input.
///
/// The key is a BLAKE3 digest of the input's JSON serialization, so it is
/// stable across process restarts. Map-valued inputs must use ordered maps for
/// that to hold, which every type in this crate does.
pub fn cache_key<T: Serialize + ?Sized>(namespace: &str, input: &T) -> String {
    let bytes = serde_json::to_vec(input).unwrap_or_default();
    format!("tabula:{}:{}", namespace, blake3::hash(&bytes).to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".into(), Duration::from_secs(60));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.get("other"), None);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn expired_entries_miss() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".into(), Duration::ZERO);
        assert_eq!(cache.get("k"), None);
        cache.purge_expired();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn unrepresentable_ttl_never_expires() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".into(), Duration::from_secs(u64::MAX));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        cache.purge_expired();
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn remove_and_clear() {
        let cache = InMemoryCache::new();
        cache.set("a", "1".into(), Duration::from_secs(60));
        cache.set("b", "2".into(), Duration::from_secs(60));
        cache.remove("a");
        assert_eq!(cache.get("a"), None);
        cache.clear();
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn noop_cache_never_hits() {
        let cache = NoopCache;
        cache.set("k", "v".into(), Duration::from_secs(60));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn keys_are_deterministic() {
        let a = cache_key("value", &("1000", "currency"));
        let b = cache_key("value", &("1000", "currency"));
        let c = cache_key("value", &("1000", "number"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("tabula:value:"));
    }
}
