use std::sync::Arc;

use tracing::info;

use crate::app::cache::{keys, CacheCoordinator};
use crate::app::pagination::{is_sentinel, Keyed, PageCursor, PAGE_SIZE};
use crate::app::{validate_text, Caller, ServiceError, ServiceResult};
use crate::domain::post::{NewPost, Post, PostQuery};
use crate::infra::store::{PostScope, PostStore};

const MAX_TITLE_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 10_000;
pub const MAX_SEARCH_LIMIT: i64 = 100;
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostStore>,
    cache: CacheCoordinator,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostStore>, cache: CacheCoordinator) -> Self {
        Self { posts, cache }
    }

    /// Up to [`PAGE_SIZE`] posts older than `last_post_id`, newest first. The
    /// sentinel id requests the latest page, which is cached.
    pub async fn feed_page(&self, last_post_id: i64) -> ServiceResult<Vec<Post>> {
        if is_sentinel(last_post_id) {
            let posts = &self.posts;
            let ttl = self.cache.ttls().latest_posts;
            return self
                .cache
                .read(keys::LATEST_POSTS, ttl, move || async move {
                    let page = posts
                        .list_posts(PostScope::All, PageCursor::Latest, PAGE_SIZE)
                        .await?;
                    Ok::<_, ServiceError>(page)
                })
                .await;
        }

        let reference = self
            .posts
            .find_post(last_post_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("post", last_post_id))?;

        let page = self
            .posts
            .list_posts(PostScope::All, PageCursor::Before(reference.keyset()), PAGE_SIZE)
            .await?;
        Ok(page)
    }

    /// Same paging as [`Self::feed_page`], restricted to one author. The
    /// reference post must belong to that author.
    pub async fn author_page(&self, author_id: i64, last_post_id: i64) -> ServiceResult<Vec<Post>> {
        if !self.posts.author_exists(author_id).await? {
            return Err(ServiceError::not_found("user", author_id));
        }

        let cursor = if is_sentinel(last_post_id) {
            PageCursor::Latest
        } else {
            let reference = self
                .posts
                .find_post(last_post_id)
                .await?
                .filter(|post| post.author_id == author_id)
                .ok_or_else(|| ServiceError::not_found("post", last_post_id))?;
            PageCursor::Before(reference.keyset())
        };

        let page = self
            .posts
            .list_posts(PostScope::Author(author_id), cursor, PAGE_SIZE)
            .await?;
        Ok(page)
    }

    pub async fn search(&self, query: PostQuery) -> ServiceResult<Vec<Post>> {
        if !(1..=MAX_SEARCH_LIMIT).contains(&query.limit) {
            return Err(ServiceError::validation(format!(
                "limit must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }
        if query.offset < 0 {
            return Err(ServiceError::validation("offset cannot be negative"));
        }
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(ServiceError::validation("from must not be after to"));
            }
        }

        Ok(self.posts.search_posts(&query).await?)
    }

    pub async fn get_post(&self, post_id: i64) -> ServiceResult<Post> {
        let posts = &self.posts;
        let ttl = self.cache.ttls().post;
        self.cache
            .read(&keys::post(post_id), ttl, move || async move {
                posts
                    .find_post(post_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("post", post_id))
            })
            .await
    }

    pub async fn create_post(
        &self,
        author_id: i64,
        title: String,
        content: String,
    ) -> ServiceResult<Post> {
        validate_post(&title, &content)?;
        if !self.posts.author_exists(author_id).await? {
            return Err(ServiceError::not_found("user", author_id));
        }

        let post = self
            .posts
            .insert_post(NewPost {
                author_id,
                title,
                content,
            })
            .await?;

        self.cache.post_created().await;
        info!(post_id = post.id, author_id, "post created");
        Ok(post)
    }

    pub async fn update_post(
        &self,
        post_id: i64,
        title: String,
        content: String,
        caller: Caller,
    ) -> ServiceResult<Post> {
        validate_post(&title, &content)?;
        self.owned_post(post_id, caller).await?;

        let post = self
            .posts
            .update_post(post_id, &title, &content)
            .await?
            .ok_or_else(|| ServiceError::not_found("post", post_id))?;

        self.cache.post_changed(post_id).await;
        Ok(post)
    }

    /// Deletes the post and, with it, every comment on it.
    pub async fn delete_post(&self, post_id: i64, caller: Caller) -> ServiceResult<()> {
        self.owned_post(post_id, caller).await?;

        if !self.posts.delete_post(post_id).await? {
            return Err(ServiceError::not_found("post", post_id));
        }

        self.cache.post_deleted(post_id).await;
        info!(post_id, caller_id = caller.user_id, "post deleted");
        Ok(())
    }

    /// Loads the post if `caller` may modify it. Posts the caller may not
    /// touch are reported as missing.
    async fn owned_post(&self, post_id: i64, caller: Caller) -> ServiceResult<Post> {
        self.posts
            .find_post(post_id)
            .await?
            .filter(|post| caller.can_modify(post.author_id))
            .ok_or_else(|| ServiceError::not_found("post", post_id))
    }
}

fn validate_post(title: &str, content: &str) -> ServiceResult<()> {
    validate_text("title", title, MAX_TITLE_LEN)?;
    validate_text("content", content, MAX_CONTENT_LEN)
}
