//! Short-lived TTL cache and a caching adapter for instrument metadata

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::errors::Result;
use super::traits::InstrumentMetadataSource;
use super::types::InstrumentMeta;

/// Default lifetime of a cached metadata entry
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(1);

/// Thread-safe key/value cache with per-entry expiry
pub struct TtlCache<V> {
    data: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            data: DashMap::new(),
            default_ttl,
        }
    }

    /// Get a live value, evicting it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.data.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.value.clone())
        } else {
            drop(entry);
            self.data.remove(key);
            None
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.data.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &str) -> Option<V> {
        self.data.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drop every expired entry
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.data.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Wraps any metadata source with a short TTL cache
///
/// The resolver itself never caches; this adapter sits on the caller side.
pub struct CachedMetadataSource<S> {
    inner: S,
    cache: Arc<TtlCache<InstrumentMeta>>,
}

impl<S: InstrumentMetadataSource> CachedMetadataSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_METADATA_TTL)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Arc::new(TtlCache::new(ttl)),
        }
    }

    pub fn cache(&self) -> &TtlCache<InstrumentMeta> {
        &self.cache
    }
}

#[async_trait]
impl<S: InstrumentMetadataSource> InstrumentMetadataSource for CachedMetadataSource<S> {
    async fn instrument(&self, symbol: &str) -> Result<InstrumentMeta> {
        if let Some(meta) = self.cache.get(symbol) {
            return Ok(meta);
        }
        debug!(symbol = %symbol, "metadata cache miss");
        let meta = self.inner.instrument(symbol).await?;
        self.cache.set(symbol, meta.clone());
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::MockInstrumentMetadataSource;

    #[test]
    fn test_ttl_cache_expiry() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        cache.set("a", 1);
        cache.set_with_ttl("b", 2, Duration::ZERO);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.invalidate("a"), Some(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_removes_expired() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::ZERO);
        cache.set("x", 1);
        cache.set("y", 2);
        assert_eq!(cache.len(), 2);
        cache.cleanup();
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_cached_source_hits_inner_once() {
        let mut inner = MockInstrumentMetadataSource::new();
        inner
            .expect_instrument()
            .times(1)
            .returning(|symbol| Ok(InstrumentMeta::forex(symbol)));

        let cached = CachedMetadataSource::with_ttl(inner, Duration::from_secs(60));
        let first = cached.instrument("EURUSD").await.unwrap();
        let second = cached.instrument("EURUSD").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.cache().len(), 1);
    }
}
