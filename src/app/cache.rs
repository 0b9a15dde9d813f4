//! Read-through caching and write-side invalidation.
//!
//! Every cache key the service uses is named here, together with its TTL and
//! the writes that delete it. The cache is an optimization only: a failing
//! cache store degrades reads to the database and turns invalidation into a
//! no-op bounded by TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::infra::cache::CacheStore;

pub mod keys {
    /// Most recent feed page.
    pub const LATEST_POSTS: &str = "post:latest";

    pub fn post(post_id: i64) -> String {
        format!("post:{}", post_id)
    }

    pub fn comment_tree(post_id: i64) -> String {
        format!("comments:tree:{}", post_id)
    }

    pub fn top_comments(post_id: i64) -> String {
        format!("comments:top:{}", post_id)
    }

    pub fn comment_count(post_id: i64) -> String {
        format!("comments:count:{}", post_id)
    }
}

/// Lifetime of each cached view.
///
/// `top_comments` and `comment_count` are never invalidated by comment writes,
/// so their TTL is the upper bound on how stale those views can get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub latest_posts: Duration,
    pub post: Duration,
    pub comment_tree: Duration,
    pub top_comments: Duration,
    pub comment_count: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            latest_posts: Duration::from_secs(5 * 60),
            post: Duration::from_secs(10 * 60),
            comment_tree: Duration::from_secs(5 * 60),
            top_comments: Duration::from_secs(60),
            comment_count: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Clone)]
pub struct CacheCoordinator {
    store: Arc<dyn CacheStore>,
    ttls: CacheTtls,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn CacheStore>, ttls: CacheTtls) -> Self {
        Self { store, ttls }
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Returns the value cached under `key`, or runs `loader` and caches what
    /// it returns for `ttl`. Loader errors are returned and nothing is cached.
    pub async fn read<T, E, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.read_when(key, ttl, |_| true, loader).await
    }

    /// Like [`Self::read`], but a loaded value is only cached when `cacheable`
    /// accepts it.
    pub async fn read_when<T, E, C, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        cacheable: C,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        C: FnOnce(&T) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.lookup(key).await {
            return Ok(cached);
        }

        let value = loader().await?;
        if cacheable(&value) {
            self.populate(key, &value, ttl).await;
        } else {
            debug!(key, "value not cacheable, skipping cache write");
        }
        Ok(value)
    }

    /// Deletes every key. Absent keys and cache failures are not errors.
    pub async fn invalidate<K: AsRef<str>>(&self, keys: &[K]) {
        for key in keys {
            let key = key.as_ref();
            match self.store.delete(key).await {
                Ok(()) => debug!(key, "cache invalidated"),
                Err(err) => warn!(error = ?err, key, "failed to invalidate cache key"),
            }
        }
    }

    pub async fn post_created(&self) {
        self.invalidate(&[keys::LATEST_POSTS]).await;
    }

    pub async fn post_changed(&self, post_id: i64) {
        self.invalidate(&[keys::post(post_id), keys::LATEST_POSTS.to_string()])
            .await;
    }

    pub async fn post_deleted(&self, post_id: i64) {
        self.invalidate(&[
            keys::post(post_id),
            keys::LATEST_POSTS.to_string(),
            keys::comment_tree(post_id),
        ])
        .await;
    }

    /// A comment on `post_id` was created, edited or deleted. Only the tree is
    /// dropped; top-level and count views expire on their own TTL.
    pub async fn comment_changed(&self, post_id: i64) {
        self.invalidate(&[keys::comment_tree(post_id)]).await;
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = match self.store.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(err) => {
                warn!(error = ?err, key, "cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(err) => {
                warn!(error = ?err, key, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = ?err, key, "failed to encode cache entry");
                return;
            }
        };
        if let Err(err) = self.store.set(key, &payload, ttl).await {
            warn!(error = ?err, key, "failed to write cache");
        }
    }
}
