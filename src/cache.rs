//! Short-TTL response cache for provider message pages.
//!
//! One fixed key per provider in practice; the capacity bound exists as a
//! safety net rather than a working-set limit.

use crate::providers::MessagePage;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use tokio::sync::RwLock;

/// Cached page with an absolute expiry set at insertion.
#[derive(Clone, Debug)]
struct CacheEntry {
    page: MessagePage,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(page: MessagePage, ttl: Duration) -> Self {
        Self {
            page,
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-memory cache with per-entry TTL and an evict-oldest-inserted
/// capacity bound. Guarded by a single lock so concurrent requests stay
/// consistent.
pub struct ResponseCache {
    store: RwLock<IndexMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            store: RwLock::new(IndexMap::new()),
            ttl: Duration::seconds(ttl_secs as i64),
            max_entries,
        }
    }

    /// Returns the cached page, or `None` when the key is absent or its
    /// entry has outlived the TTL. Expired entries are removed on the way
    /// out.
    pub async fn get(&self, key: &str) -> Option<MessagePage> {
        {
            let store = self.store.read().await;
            match store.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.page.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but is stale; drop it.
        let mut store = self.store.write().await;
        store.shift_remove(key);
        None
    }

    /// Always overwrites. When the map would grow past `max_entries`, the
    /// oldest-inserted entries are evicted first.
    pub async fn put(&self, key: &str, page: MessagePage) {
        let mut store = self.store.write().await;
        store.shift_remove(key);
        while store.len() >= self.max_entries {
            store.shift_remove_index(0);
        }
        store.insert(key.to_string(), CacheEntry::new(page, self.ttl));
    }

    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        store.clear();
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}
