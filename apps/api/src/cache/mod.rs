//! Read-through cache for extraction results, keyed by source content.
//!
//! Cache failures never fail a scan: they are logged and the extractor is
//! called as if the cache were empty.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::matching::{CandidateExtractor, ExtractionError, RawCandidate, ScanSource};

pub mod memory;
pub mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

const KEY_PREFIX: &str = "jobflow:extract";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cached value could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait ReadThroughCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// What a cached extraction is filed under.
///
/// Two sources with the same key must yield the same extraction, so the key
/// is derived from the content (or from an id that is unique across users),
/// never from an id a client picks freely.
pub trait CacheKey {
    fn cache_key(&self) -> String;
}

/// Hex SHA-256 of `text`, for content-addressed keys.
pub fn content_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

pub fn extraction_key(cache_key: &str) -> String {
    format!("{KEY_PREFIX}:{cache_key}")
}

/// Wraps an extractor so repeated scans of the same source skip the
/// upstream call. Only successful extractions are stored.
pub struct CachedExtractor<E, C: ?Sized> {
    inner: E,
    cache: Arc<C>,
}

impl<E, C: ?Sized> CachedExtractor<E, C> {
    pub fn new(inner: E, cache: Arc<C>) -> Self {
        Self { inner, cache }
    }

    async fn lookup(&self, key: &str) -> Option<Vec<RawCandidate>>
    where
        C: ReadThroughCache,
    {
        let cached = match self.cache.get(key).await {
            Ok(Some(cached)) => cached,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&cached) {
            Ok(candidates) => Some(candidates),
            Err(e) => {
                warn!("Ignoring undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, key: &str, candidates: &[RawCandidate])
    where
        C: ReadThroughCache,
    {
        let result = match serde_json::to_string(candidates) {
            Ok(encoded) => self.cache.set(key, &encoded).await,
            Err(e) => Err(CacheError::from(e)),
        };
        if let Err(e) = result {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }
}

#[async_trait]
impl<S, E, C> CandidateExtractor<S> for CachedExtractor<E, C>
where
    S: ScanSource + CacheKey,
    E: CandidateExtractor<S>,
    C: ReadThroughCache + ?Sized,
{
    async fn extract(&self, source: &S) -> Result<Vec<RawCandidate>, ExtractionError> {
        let key = extraction_key(&source.cache_key());

        if let Some(candidates) = self.lookup(&key).await {
            debug!("Cache hit for source {} ({})", source.source_id(), key);
            return Ok(candidates);
        }

        let candidates = self.inner.extract(source).await?;
        self.store(&key, &candidates).await;
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Doc(String);

    impl ScanSource for Doc {
        fn source_id(&self) -> &str {
            &self.0
        }
    }

    impl CacheKey for Doc {
        fn cache_key(&self) -> String {
            self.0.clone()
        }
    }

    fn memory() -> Arc<MemoryCache> {
        Arc::new(MemoryCache::new(Duration::from_secs(60)))
    }

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CandidateExtractor<Doc> for CountingExtractor {
        async fn extract(&self, source: &Doc) -> Result<Vec<RawCandidate>, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ExtractionError::Upstream("down".to_string()));
            }
            Ok(vec![RawCandidate {
                title: Some(format!("Engineer from {}", source.0)),
                application_url: Some(format!("https://jobs.example/{}", source.0)),
                ..Default::default()
            }])
        }
    }

    /// A cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl ReadThroughCache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(serde_json::from_str::<()>("x").unwrap_err().into())
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
            Err(serde_json::from_str::<()>("x").unwrap_err().into())
        }
    }

    #[test]
    fn test_extraction_key_is_namespaced() {
        assert_eq!(extraction_key("msg-1"), "jobflow:extract:msg-1");
    }

    #[test]
    fn test_content_digest_is_stable_hex() {
        assert_eq!(
            content_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(content_digest("user A job"), content_digest("user B job"));
    }

    #[tokio::test]
    async fn test_second_extract_is_served_from_cache() {
        let cache = memory();
        let cached = CachedExtractor::new(CountingExtractor::default(), cache.clone());
        let doc = Doc("a".to_string());

        let first = cached.extract(&doc).await.unwrap();
        let second = cached.extract(&doc).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
        assert!(cache.get("jobflow:extract:a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = memory();
        let cached = CachedExtractor::new(
            CountingExtractor {
                fail: true,
                ..Default::default()
            },
            cache.clone(),
        );
        let doc = Doc("a".to_string());

        assert!(cached.extract(&doc).await.is_err());
        assert!(cached.extract(&doc).await.is_err());
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.get("jobflow:extract:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_broken_cache_is_bypassed() {
        let cached = CachedExtractor::new(CountingExtractor::default(), Arc::new(BrokenCache));
        let candidates = cached.extract(&Doc("b".to_string())).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_falls_through_and_is_overwritten() {
        let cache = memory();
        cache.set("jobflow:extract:c", "not json").await.unwrap();
        let cached = CachedExtractor::new(CountingExtractor::default(), cache.clone());

        let candidates = cached.extract(&Doc("c".to_string())).await.unwrap();
        assert_eq!(candidates.len(), 1);
        let stored = cache.get("jobflow:extract:c").await.unwrap().unwrap();
        assert!(stored.starts_with('['));
    }

    #[tokio::test]
    async fn test_works_behind_dyn_cache() {
        let cache: Arc<dyn ReadThroughCache> = memory();
        let cached = CachedExtractor::new(CountingExtractor::default(), cache);
        let doc = Doc("d".to_string());
        cached.extract(&doc).await.unwrap();
        cached.extract(&doc).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }
}
