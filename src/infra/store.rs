use anyhow::Result;
use async_trait::async_trait;

use crate::app::pagination::PageCursor;
use crate::domain::comment::{Comment, NewComment};
use crate::domain::post::{NewPost, Post, PostQuery};

/// Which posts a feed page is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Author(i64),
}

impl PostScope {
    pub fn author_id(&self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Author(author_id) => Some(*author_id),
        }
    }

    pub fn includes(&self, post: &Post) -> bool {
        self.author_id().map_or(true, |author_id| post.author_id == author_id)
    }
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn author_exists(&self, author_id: i64) -> Result<bool>;

    async fn insert_post(&self, post: NewPost) -> Result<Post>;

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>>;

    async fn update_post(&self, post_id: i64, title: &str, content: &str) -> Result<Option<Post>>;

    /// Removes the post and every comment on it in one transaction.
    async fn delete_post(&self, post_id: i64) -> Result<bool>;

    /// At most `limit` posts in `scope` admitted by `cursor`, newest first.
    async fn list_posts(&self, scope: PostScope, cursor: PageCursor, limit: i64)
        -> Result<Vec<Post>>;

    async fn search_posts(&self, query: &PostQuery) -> Result<Vec<Post>>;

    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    async fn find_comment(&self, comment_id: i64) -> Result<Option<Comment>>;

    async fn update_comment(&self, comment_id: i64, content: &str) -> Result<Option<Comment>>;

    /// Removes a comment together with every reply below it.
    async fn delete_comment(&self, comment_id: i64) -> Result<bool>;

    /// Every comment on the post, oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>>;

    /// Comments on the post sharing `parent_id`, admitted by `cursor`, newest first.
    async fn list_sibling_comments(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        cursor: PageCursor,
        limit: i64,
    ) -> Result<Vec<Comment>>;

    async fn count_comments(&self, post_id: i64) -> Result<i64>;
}
