//! In-process cache with LRU eviction and lazy expiry.
//!
//! Stands in for Redis in tests and single-node runs. Expired entries are
//! dropped when they are next read.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::infra::cache::CacheStore;

const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Clone)]
pub struct MemoryCache {
    store: Arc<Mutex<LruCache<String, CacheEntry>>>,
    offline: Arc<AtomicBool>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryCache {
    /// Creates a cache holding at most `max_entries` keys. Zero is clamped to one.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Arc::new(Mutex::new(LruCache::new(capacity))),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every subsequent call fail until switched back, the way an
    /// unreachable Redis would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reads a raw entry, ignoring expiry and the offline switch.
    pub async fn peek(&self, key: &str) -> Option<String> {
        let store = self.store.lock().await;
        store.peek(key).map(|entry| entry.value.clone())
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("memory cache is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_online()?;
        let mut store = self.store.lock().await;
        let expired = match store.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            store.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.check_online()?;
        let entry = CacheEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.store.lock().await.put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_online()?;
        self.store.lock().await.pop(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_entries_read_as_missing() {
        let cache = MemoryCache::new(8);
        cache.set("k", "v", Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.peek("k").await, None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = MemoryCache::new(8);
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", "1", ttl).await.unwrap();
        cache.set("b", "2", ttl).await.unwrap();
        cache.get("a").await.unwrap();
        cache.set("c", "3", ttl).await.unwrap();

        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(cache.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn offline_cache_fails_every_call() {
        let cache = MemoryCache::new(2);
        cache.set_offline(true);
        assert!(cache.get("a").await.is_err());
        assert!(cache.set("a", "1", Duration::from_secs(1)).await.is_err());
        assert!(cache.delete("a").await.is_err());
        cache.set_offline(false);
        assert!(cache.ping().await.is_ok());
    }
}
