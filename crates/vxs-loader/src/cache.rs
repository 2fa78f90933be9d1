//! Loader data cache
//!
//! One [`LoaderEntry`] per key (the route file on the server, the href on
//! the client). Entries move `Unresolved → Pending → Resolved | Failed`;
//! concurrent loads of a pending entry await the same shared future, so a
//! loader runs at most once per key until the entry is invalidated.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::error::{LoaderError, Result};

/// Entries kept before the least recently used one is evicted
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

pub type SharedLoad = Shared<BoxFuture<'static, Result<Value>>>;

/// Loader output with metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedLoaderData {
    pub value: Value,

    /// When the loader produced the value
    pub loaded_at: DateTime<Utc>,

    pub metadata: EntryMetadata,

    /// Href the value was loaded for, when the key is a route file
    pub href: Option<String>,
}

impl CachedLoaderData {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            loaded_at: Utc::now(),
            metadata: EntryMetadata::default(),
            href: None,
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.loaded_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct EntryMetadata {
    /// Reads served from this entry
    pub hits: u64,
    /// Serialized size of the value in bytes
    pub size_bytes: usize,
}

/// State of one cache entry
#[derive(Clone)]
pub enum LoaderEntry {
    Unresolved,
    Pending { id: u64, load: SharedLoad },
    Resolved(CachedLoaderData),
    Failed(LoaderError),
}

impl std::fmt::Debug for LoaderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved => f.write_str("Unresolved"),
            Self::Pending { id, .. } => f.debug_struct("Pending").field("id", id).finish(),
            Self::Resolved(data) => f.debug_tuple("Resolved").field(&data.value).finish(),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Observable state of an entry, for callers that poll
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    Unresolved,
    Pending,
    Resolved(Value),
    Failed(LoaderError),
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Loads that joined an already pending entry
    pub coalesced: u64,
    pub failures: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

enum Begin {
    Ready(Value),
    Wait(u64, SharedLoad),
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

/// Per-key loader data, keyed by route file (`LoaderDataCache[route.file]`)
///
/// Bounded: past `capacity` entries the least recently used one is evicted.
/// An evicted pending load still completes for its waiters.
pub struct LoaderDataCache {
    entries: Mutex<LruCache<String, LoaderEntry>>,
    next_id: AtomicU64,
    counters: Counters,
}

impl Default for LoaderDataCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl LoaderDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            next_id: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn state(&self, key: &str) -> EntryState {
        match self.entries.lock().peek(key) {
            None | Some(LoaderEntry::Unresolved) => EntryState::Unresolved,
            Some(LoaderEntry::Pending { .. }) => EntryState::Pending,
            Some(LoaderEntry::Resolved(data)) => EntryState::Resolved(data.value.clone()),
            Some(LoaderEntry::Failed(err)) => EntryState::Failed(err.clone()),
        }
    }

    /// The resolved value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(LoaderEntry::Resolved(data)) => {
                data.metadata.hits += 1;
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(data.value.clone())
            }
            _ => None,
        }
    }

    /// Stores the last computed value for `key`.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let mut data = CachedLoaderData::new(value);
        data.metadata.size_bytes = data.value.to_string().len();
        self.entries.lock().put(key.into(), LoaderEntry::Resolved(data));
    }

    /// Stores the value route file `key` computed for `href`.
    pub fn set_for_href(&self, key: impl Into<String>, href: impl Into<String>, value: Value) {
        let mut data = CachedLoaderData::new(value);
        data.metadata.size_bytes = data.value.to_string().len();
        data.href = Some(href.into());
        self.entries.lock().put(key.into(), LoaderEntry::Resolved(data));
    }

    /// Removes and returns the value stored for `key` at `href`.
    ///
    /// An entry computed for a different href is left in place.
    pub fn take_for_href(&self, key: &str, href: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        let matches = matches!(
            entries.peek(key),
            Some(LoaderEntry::Resolved(data)) if data.href.as_deref() == Some(href)
        );
        if !matches {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        match entries.pop(key) {
            Some(LoaderEntry::Resolved(data)) => Some(data.value),
            _ => None,
        }
    }

    /// Resolves `key`, running `fetch` only when nothing is resolved or pending
    ///
    /// A failed entry is retried. Callers racing on the same key share one
    /// fetch and all observe its result.
    pub async fn load<F, Fut>(&self, key: &str, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let (id, load) = match self.begin(key, fetch) {
            Begin::Ready(value) => return Ok(value),
            Begin::Wait(id, load) => (id, load),
        };

        let result = load.await;
        self.settle(key, id, &result);
        result
    }

    fn begin<F, Fut>(&self, key: &str, fetch: F) -> Begin
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(LoaderEntry::Resolved(data)) => {
                data.metadata.hits += 1;
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Begin::Ready(data.value.clone())
            }
            Some(LoaderEntry::Pending { id, load }) => {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                Begin::Wait(*id, load.clone())
            }
            _ => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let load = fetch().boxed().shared();
                entries.put(key.to_string(), LoaderEntry::Pending { id, load: load.clone() });
                debug!(key = %key, "Loader entry pending");
                Begin::Wait(id, load)
            }
        }
    }

    fn settle(&self, key: &str, id: u64, result: &Result<Value>) {
        let mut entries = self.entries.lock();
        let current = matches!(entries.peek(key), Some(LoaderEntry::Pending { id: pending, .. }) if *pending == id);
        if !current {
            return;
        }

        let next = match result {
            Ok(value) => {
                let mut data = CachedLoaderData::new(value.clone());
                data.metadata.size_bytes = value.to_string().len();
                LoaderEntry::Resolved(data)
            }
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %err, "Loader failed");
                LoaderEntry::Failed(err.clone())
            }
        };
        entries.put(key.to_string(), next);
    }

    /// Drops the entry for `key`. A pending load still completes for its
    /// waiters but no longer settles the entry.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().iter().map(|(key, _)| key.clone()).collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            entries: self.entries.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = LoaderDataCache::new();
        cache.set("./index.tsx", json!({ "title": "home" }));

        assert_eq!(cache.get("./index.tsx"), Some(json!({ "title": "home" })));
        assert_eq!(cache.get("./other.tsx"), None);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_failed_entry_is_retried() {
        let cache = LoaderDataCache::new();

        let failed = cache
            .load("k", || async { Err(LoaderError::failed("./k.tsx", "boom")) })
            .await;
        assert!(failed.is_err());
        assert!(matches!(cache.state("k"), EntryState::Failed(_)));

        let value = cache.load("k", || async { Ok(json!(1)) }).await.unwrap();
        assert_eq!(value, json!(1));
        assert_eq!(cache.state("k"), EntryState::Resolved(json!(1)));

        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.failures, 1);
    }

    #[test]
    fn test_take_for_href_only_matches_its_href() {
        let cache = LoaderDataCache::new();
        cache.set_for_href("./users/[id].tsx", "/users/3", json!({ "id": "3" }));

        assert_eq!(cache.take_for_href("./users/[id].tsx", "/users/4"), None);
        assert_eq!(
            cache.take_for_href("./users/[id].tsx", "/users/3"),
            Some(json!({ "id": "3" }))
        );
        // read once
        assert_eq!(cache.take_for_href("./users/[id].tsx", "/users/3"), None);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 2, 0));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = LoaderDataCache::with_capacity(2);
        cache.set("/users/1", json!(1));
        cache.set("/users/2", json!(2));
        // touch 1 so 2 is the oldest
        assert_eq!(cache.get("/users/1"), Some(json!(1)));

        let value = cache.load("/users/3", || async { Ok(json!(3)) }).await.unwrap();

        assert_eq!(value, json!(3));
        assert_eq!(cache.keys(), vec!["/users/1".to_string(), "/users/3".to_string()]);
        assert_eq!(cache.state("/users/2"), EntryState::Unresolved);
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn test_zero_capacity_keeps_one_entry() {
        let cache = LoaderDataCache::with_capacity(0);
        cache.set("a", json!("a"));
        cache.set("b", json!("b"));

        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.keys(), vec!["b".to_string()]);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 2,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 2.0 / 3.0);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
