use crate::types::CveRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub cves: Vec<CveRecord>,
    pub total: u64,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(cves: Vec<CveRecord>, total: u64) -> Self {
        Self {
            cves,
            total,
            timestamp: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        (Utc::now() - self.timestamp).to_std().unwrap_or_default()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Storage behind [`ResponseCache`]. Swap in an external store by implementing this.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn put(&self, key: &str, entry: CacheEntry);
    fn len(&self) -> usize;
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime map. Entries are overwritten on refresh and never evicted.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn put(&self, key: &str, entry: CacheEntry) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), entry);
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Keyword-keyed response cache with a freshness window.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The entry for `key` if it is younger than the TTL.
    pub fn fresh(&self, key: &str) -> Option<CacheEntry> {
        self.store.get(key).filter(|entry| entry.is_fresh(self.ttl))
    }

    /// Overwrites whatever is stored for `key`.
    pub fn store(&self, key: &str, cves: Vec<CveRecord>, total: u64) {
        self.store.put(key, CacheEntry::new(cves, total));
    }

    pub fn put_entry(&self, key: &str, entry: CacheEntry) {
        self.store.put(key, entry);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.store.len())
            .finish()
    }
}
