#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use threadline::app::cache::CacheTtls;
use threadline::app::comments::CommentService;
use threadline::app::posts::PostService;
use threadline::domain::comment::{Comment, NewComment};
use threadline::domain::post::{NewPost, Post};
use threadline::domain::user::Author;
use threadline::infra::memory_cache::MemoryCache;
use threadline::infra::memory_store::MemoryStore;
use threadline::AppState;

// ---------------------------------------------------------------------------
// TestApp: one isolated in-memory store and cache per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub cache: MemoryCache,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    /// `id` of every element of a JSON array body.
    pub fn ids(&self) -> Vec<i64> {
        self.json()
            .as_array()
            .map(|items| items.iter().filter_map(|item| item["id"].as_i64()).collect())
            .unwrap_or_default()
    }
}

/// Request identity, sent as the gateway headers.
#[derive(Clone, Copy)]
pub enum As {
    Anonymous,
    User(i64),
    Admin(i64),
}

pub async fn app() -> TestApp {
    TestApp::with_ttls(CacheTtls::default())
}

impl TestApp {
    pub fn with_ttls(ttls: CacheTtls) -> Self {
        let store = MemoryStore::new();
        let cache = MemoryCache::new(1_000);
        let state = AppState::in_memory(store.clone(), cache.clone(), ttls);
        let router = threadline::http::router(state.clone());

        TestApp {
            router,
            state,
            store,
            cache,
        }
    }

    pub fn posts(&self) -> PostService {
        self.state.post_service()
    }

    pub fn comments(&self) -> CommentService {
        self.state.comment_service()
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        caller: As,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        match caller {
            As::Anonymous => {}
            As::User(id) => builder = builder.header("x-user-id", id.to_string()),
            As::Admin(id) => {
                builder = builder
                    .header("x-user-id", id.to_string())
                    .header("x-user-admin", "true");
            }
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None, As::Anonymous).await
    }

    pub async fn post_json(&self, path: &str, body: Value, caller: As) -> TestResponse {
        self.request(Method::POST, path, Some(body), caller).await
    }

    pub async fn put_json(&self, path: &str, body: Value, caller: As) -> TestResponse {
        self.request(Method::PUT, path, Some(body), caller).await
    }

    pub async fn delete(&self, path: &str, caller: As) -> TestResponse {
        self.request(Method::DELETE, path, None, caller).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    pub async fn create_author(&self, handle: &str) -> Author {
        self.store.add_author(handle).await
    }

    /// Inserts a post directly, bypassing the service and its cache.
    pub async fn seed_post(&self, author_id: i64, title: &str, created_at: OffsetDateTime) -> Post {
        self.store
            .insert_post_at(
                NewPost {
                    author_id,
                    title: title.to_string(),
                    content: format!("{} body", title),
                },
                created_at,
            )
            .await
    }

    /// Inserts a comment directly, bypassing depth capping and validation.
    pub async fn seed_comment(
        &self,
        post_id: i64,
        author_id: i64,
        parent_id: Option<i64>,
        created_at: OffsetDateTime,
    ) -> Comment {
        self.store
            .insert_comment_at(
                NewComment {
                    post_id,
                    author_id,
                    parent_id,
                    content: "seeded".to_string(),
                },
                created_at,
            )
            .await
    }
}

/// Fixed base instant so seeded timestamps are deterministic.
pub fn t0() -> OffsetDateTime {
    time::macros::datetime!(2024-01-01 12:00 UTC)
}

pub fn at(seconds: i64) -> OffsetDateTime {
    t0() + Duration::seconds(seconds)
}
