use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::app::cache::CacheTtls;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown cache backend: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    pub cache_memory_entries: usize,
    pub cache_ttls: CacheTtls,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let store_backend: StoreBackend = env_or_parse("STORE_BACKEND", "postgres")?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("missing required env var: DATABASE_URL"));
        }

        let defaults = CacheTtls::default();
        let cache_ttls = CacheTtls {
            latest_posts: env_or_seconds(
                "CACHE_TTL_LATEST_POSTS_SECONDS",
                defaults.latest_posts,
            )?,
            post: env_or_seconds("CACHE_TTL_POST_SECONDS", defaults.post)?,
            comment_tree: env_or_seconds(
                "CACHE_TTL_COMMENT_TREE_SECONDS",
                defaults.comment_tree,
            )?,
            top_comments: env_or_seconds(
                "CACHE_TTL_TOP_COMMENTS_SECONDS",
                defaults.top_comments,
            )?,
            comment_count: env_or_seconds(
                "CACHE_TTL_COMMENT_COUNT_SECONDS",
                defaults.comment_count,
            )?,
        };

        Ok(Self {
            http_addr,
            store_backend,
            database_url,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            cache_backend: env_or_parse("CACHE_BACKEND", "redis")?,
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1/"),
            cache_memory_entries: env_or_parse("CACHE_MEMORY_ENTRIES", "10000")?,
            cache_ttls,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_or_seconds(key: &str, default: Duration) -> Result<Duration> {
    let seconds: u64 = env_or_parse(key, &default.as_secs().to_string())?;
    Ok(Duration::from_secs(seconds))
}
