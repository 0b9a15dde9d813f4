use std::sync::Arc;

use tracing::{debug, info};

use crate::app::cache::{keys, CacheCoordinator};
use crate::app::comment_tree::{build_tree, capped_parent, depth};
use crate::app::pagination::{is_sentinel, Keyed, PageCursor, PAGE_SIZE};
use crate::app::{validate_text, Caller, ServiceError, ServiceResult};
use crate::domain::comment::{Comment, CommentNode, NewComment};
use crate::infra::store::{CommentStore, PostStore};

const MAX_COMMENT_LEN: usize = 2_000;

/// Deeper forests are not cached: the JSON decoder refuses to nest that far
/// when reading them back.
pub const MAX_CACHED_TREE_DEPTH: usize = 48;

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostStore>,
    comments: Arc<dyn CommentStore>,
    cache: CacheCoordinator,
}

impl CommentService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        comments: Arc<dyn CommentStore>,
        cache: CacheCoordinator,
    ) -> Self {
        Self {
            posts,
            comments,
            cache,
        }
    }

    /// Every comment on the post, oldest first.
    pub async fn list_flat(&self, post_id: i64) -> ServiceResult<Vec<Comment>> {
        ensure_post(self.posts.as_ref(), post_id).await?;
        Ok(self.comments.list_comments(post_id).await?)
    }

    /// The post's comments as a reply forest.
    pub async fn tree(&self, post_id: i64) -> ServiceResult<Vec<CommentNode>> {
        let posts = self.posts.as_ref();
        let comments = self.comments.as_ref();
        let ttl = self.cache.ttls().comment_tree;
        self.cache
            .read_when(
                &keys::comment_tree(post_id),
                ttl,
                |forest: &Vec<CommentNode>| depth(forest) <= MAX_CACHED_TREE_DEPTH,
                move || async move {
                    ensure_post(posts, post_id).await?;
                    let rows = comments.list_comments(post_id).await?;
                    Ok::<_, ServiceError>(build_tree(&rows))
                },
            )
            .await
    }

    /// Creates a comment. A reply to a reply is stored under the replied-to
    /// comment's parent.
    pub async fn create(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        content: String,
        author_id: i64,
    ) -> ServiceResult<Comment> {
        validate_text("content", &content, MAX_COMMENT_LEN)?;
        ensure_post(self.posts.as_ref(), post_id).await?;
        if !self.posts.author_exists(author_id).await? {
            return Err(ServiceError::not_found("user", author_id));
        }

        let parent_id = match parent_id {
            Some(requested_id) => {
                let requested = self
                    .comments
                    .find_comment(requested_id)
                    .await?
                    .filter(|parent| parent.post_id == post_id)
                    .ok_or_else(|| ServiceError::validation("invalid parent comment"))?;
                let effective = capped_parent(&requested);
                if effective != requested_id {
                    debug!(
                        post_id,
                        requested_id,
                        effective,
                        "reply re-parented to keep depth cap"
                    );
                }
                Some(effective)
            }
            None => None,
        };

        let comment = self
            .comments
            .insert_comment(NewComment {
                post_id,
                author_id,
                parent_id,
                content,
            })
            .await?;

        self.cache.comment_changed(post_id).await;
        info!(comment_id = comment.id, post_id, author_id, "comment created");
        Ok(comment)
    }

    pub async fn update(
        &self,
        comment_id: i64,
        content: String,
        caller: Caller,
    ) -> ServiceResult<Comment> {
        validate_text("content", &content, MAX_COMMENT_LEN)?;
        self.owned_comment(comment_id, caller).await?;

        let comment = self
            .comments
            .update_comment(comment_id, &content)
            .await?
            .ok_or_else(|| ServiceError::not_found("comment", comment_id))?;

        self.cache.comment_changed(comment.post_id).await;
        Ok(comment)
    }

    pub async fn delete(&self, comment_id: i64, caller: Caller) -> ServiceResult<()> {
        let comment = self.owned_comment(comment_id, caller).await?;

        if !self.comments.delete_comment(comment_id).await? {
            return Err(ServiceError::not_found("comment", comment_id));
        }

        self.cache.comment_changed(comment.post_id).await;
        info!(
            comment_id,
            post_id = comment.post_id,
            caller_id = caller.user_id,
            "comment deleted"
        );
        Ok(())
    }

    /// Up to [`PAGE_SIZE`] siblings of `last_comment_id` (same post, same
    /// parent) older than it, newest first. The sentinel id requests the
    /// latest top-level comments, which are cached.
    pub async fn previous(
        &self,
        post_id: i64,
        last_comment_id: i64,
    ) -> ServiceResult<Vec<Comment>> {
        if is_sentinel(last_comment_id) {
            let posts = self.posts.as_ref();
            let comments = self.comments.as_ref();
            let ttl = self.cache.ttls().top_comments;
            return self
                .cache
                .read(&keys::top_comments(post_id), ttl, move || async move {
                    ensure_post(posts, post_id).await?;
                    let page = comments
                        .list_sibling_comments(post_id, None, PageCursor::Latest, PAGE_SIZE)
                        .await?;
                    Ok::<_, ServiceError>(page)
                })
                .await;
        }

        let reference = self
            .comments
            .find_comment(last_comment_id)
            .await?
            .filter(|comment| comment.post_id == post_id)
            .ok_or_else(|| ServiceError::not_found("comment", last_comment_id))?;

        let page = self
            .comments
            .list_sibling_comments(
                post_id,
                reference.parent_id,
                PageCursor::Before(reference.keyset()),
                PAGE_SIZE,
            )
            .await?;
        Ok(page)
    }

    pub async fn count(&self, post_id: i64) -> ServiceResult<i64> {
        let posts = self.posts.as_ref();
        let comments = self.comments.as_ref();
        let ttl = self.cache.ttls().comment_count;
        self.cache
            .read(&keys::comment_count(post_id), ttl, move || async move {
                ensure_post(posts, post_id).await?;
                Ok::<_, ServiceError>(comments.count_comments(post_id).await?)
            })
            .await
    }

    async fn owned_comment(&self, comment_id: i64, caller: Caller) -> ServiceResult<Comment> {
        self.comments
            .find_comment(comment_id)
            .await?
            .filter(|comment| caller.can_modify(comment.author_id))
            .ok_or_else(|| ServiceError::not_found("comment", comment_id))
    }
}

async fn ensure_post(posts: &dyn PostStore, post_id: i64) -> ServiceResult<()> {
    match posts.find_post(post_id).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::not_found("post", post_id)),
    }
}
