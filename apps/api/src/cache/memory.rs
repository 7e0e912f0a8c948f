use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, ReadThroughCache};

/// Upper bound on entries held in process memory.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

struct Entry {
    value: String,
    stored_at: Instant,
}

/// Process-local cache, used when no Redis URL is configured.
///
/// Entries expire after the configured TTL. When full, expired entries are
/// purged first and then the oldest entry is evicted.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_fresh(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.stored_at) < self.ttl
    }
}

#[async_trait]
impl ReadThroughCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if self.is_fresh(entry, now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless a writer refreshed it in the meantime.
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| !self.is_fresh(entry, now))
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| self.is_fresh(entry, now));
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                stored_at: now,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("k", "v").await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_restarts_ttl() {
        let cache = MemoryCache::new(Duration::from_secs(10));
        cache.set("k", "old").await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("k", "new").await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_evicts_oldest() {
        let cache = MemoryCache::with_capacity(Duration::from_secs(600), 2);
        cache.set("a", "1").await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set("b", "2").await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set("c", "3").await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("b").await.unwrap().as_deref(), Some("2"));
        assert_eq!(cache.get("c").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_prefers_purging_expired() {
        let cache = MemoryCache::with_capacity(Duration::from_secs(10), 2);
        cache.set("stale", "1").await.unwrap();
        tokio::time::advance(Duration::from_secs(9)).await;
        cache.set("recent", "2").await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        cache.set("new", "3").await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("recent").await.unwrap().as_deref(), Some("2"));
        assert_eq!(cache.get("new").await.unwrap().as_deref(), Some("3"));
    }
}
