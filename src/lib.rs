pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::app::cache::{CacheCoordinator, CacheTtls};
use crate::app::comments::CommentService;
use crate::app::posts::PostService;
use crate::config::{AppConfig, CacheBackend, StoreBackend};
use crate::infra::cache::{CacheStore, RedisCache};
use crate::infra::db::Db;
use crate::infra::memory_cache::MemoryCache;
use crate::infra::memory_store::MemoryStore;
use crate::infra::pg_store::PgStore;
use crate::infra::store::{CommentStore, PostStore};

#[derive(Clone)]
pub struct AppState {
    pub post_store: Arc<dyn PostStore>,
    pub comment_store: Arc<dyn CommentStore>,
    pub cache: Arc<dyn CacheStore>,
    pub cache_ttls: CacheTtls,
}

impl AppState {
    /// Wires the backends selected by `config`, applying the schema when the
    /// store is Postgres.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let (post_store, comment_store): (Arc<dyn PostStore>, Arc<dyn CommentStore>) =
            match config.store_backend {
                StoreBackend::Postgres => {
                    let db = Db::connect(config).await?;
                    db.apply_schema().await?;
                    let store = Arc::new(PgStore::new(db));
                    (store.clone() as Arc<dyn PostStore>, store as Arc<dyn CommentStore>)
                }
                StoreBackend::Memory => {
                    tracing::warn!("using in-memory store, data is lost on restart");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone() as Arc<dyn PostStore>, store as Arc<dyn CommentStore>)
                }
            };

        let cache: Arc<dyn CacheStore> = match config.cache_backend {
            CacheBackend::Redis => Arc::new(
                RedisCache::connect(&config.redis_url)
                    .await
                    .map_err(|err| anyhow!("failed to connect to redis: {}", err))?,
            ),
            CacheBackend::Memory => Arc::new(MemoryCache::new(config.cache_memory_entries)),
        };

        Ok(Self {
            post_store,
            comment_store,
            cache,
            cache_ttls: config.cache_ttls,
        })
    }

    /// State backed by one in-memory store and the given cache.
    pub fn in_memory(store: MemoryStore, cache: MemoryCache, cache_ttls: CacheTtls) -> Self {
        let store = Arc::new(store);
        Self {
            post_store: store.clone(),
            comment_store: store,
            cache: Arc::new(cache),
            cache_ttls,
        }
    }

    pub fn cache_coordinator(&self) -> CacheCoordinator {
        CacheCoordinator::new(self.cache.clone(), self.cache_ttls)
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(self.post_store.clone(), self.cache_coordinator())
    }

    pub fn comment_service(&self) -> CommentService {
        CommentService::new(
            self.post_store.clone(),
            self.comment_store.clone(),
            self.cache_coordinator(),
        )
    }
}
