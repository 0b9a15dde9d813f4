//! In-memory persistence backend.
//!
//! Holds every table in one `RwLock` so each call sees a consistent snapshot,
//! the way a single SQL statement would. Data lives as long as the store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::app::pagination::{paginate, Keyed, PageCursor};
use crate::domain::comment::{Comment, NewComment};
use crate::domain::post::{NewPost, Post, PostQuery, PostSort};
use crate::domain::user::Author;
use crate::infra::store::{CommentStore, PostScope, PostStore};

#[derive(Default)]
struct Tables {
    authors: BTreeMap<i64, Author>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    next_id: i64,
    last_timestamp: Option<OffsetDateTime>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Wall clock, clamped so it never runs backwards between inserts.
    fn now(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let now = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(now);
        now
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an author, as the identity service would.
    pub async fn add_author(&self, handle: &str) -> Author {
        let mut tables = self.tables.write().await;
        let author = Author {
            id: tables.allocate_id(),
            handle: handle.to_string(),
        };
        tables.authors.insert(author.id, author.clone());
        author
    }

    /// Inserts a post with an explicit creation time.
    pub async fn insert_post_at(&self, post: NewPost, created_at: OffsetDateTime) -> Post {
        let mut tables = self.tables.write().await;
        let post = Post {
            id: tables.allocate_id(),
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            created_at,
        };
        tables.posts.insert(post.id, post.clone());
        post
    }

    /// Inserts a comment with an explicit creation time and no checks.
    pub async fn insert_comment_at(
        &self,
        comment: NewComment,
        created_at: OffsetDateTime,
    ) -> Comment {
        let mut tables = self.tables.write().await;
        let comment = Comment {
            id: tables.allocate_id(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            parent_id: comment.parent_id,
            content: comment.content,
            created_at,
        };
        tables.comments.insert(comment.id, comment.clone());
        comment
    }

    /// Overwrites a comment's parent link without any checks, e.g. to model
    /// rows corrupted outside this service.
    pub async fn set_comment_parent(&self, comment_id: i64, parent_id: Option<i64>) -> bool {
        let mut tables = self.tables.write().await;
        match tables.comments.get_mut(&comment_id) {
            Some(comment) => {
                comment.parent_id = parent_id;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn author_exists(&self, author_id: i64) -> Result<bool> {
        Ok(self.tables.read().await.authors.contains_key(&author_id))
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        let post = Post {
            id: tables.allocate_id(),
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            created_at: tables.now(),
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&post_id).cloned())
    }

    async fn update_post(&self, post_id: i64, title: &str, content: &str) -> Result<Option<Post>> {
        let mut tables = self.tables.write().await;
        let updated = tables.posts.get_mut(&post_id).map(|post| {
            post.title = title.to_string();
            post.content = content.to_string();
            post.clone()
        });
        Ok(updated)
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&post_id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, comment| comment.post_id != post_id);
        Ok(true)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        cursor: PageCursor,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let scoped = tables.posts.values().filter(|post| scope.includes(post)).cloned();
        Ok(paginate(scoped, cursor, limit))
    }

    async fn search_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<Post> = tables
            .posts
            .values()
            .filter(|post| query.matches(post))
            .cloned()
            .collect();

        match query.sort {
            PostSort::CreatedAtAsc => matched.sort_by_key(|post| post.keyset()),
            PostSort::CreatedAtDesc => matched.sort_by(|a, b| b.keyset().cmp(&a.keyset())),
            PostSort::TitleAsc => {
                matched.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)))
            }
            PostSort::TitleDesc => {
                matched.sort_by(|a, b| b.title.cmp(&a.title).then(b.id.cmp(&a.id)))
            }
        }

        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        let comment = Comment {
            id: tables.allocate_id(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            parent_id: comment.parent_id,
            content: comment.content,
            created_at: tables.now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&comment_id).cloned())
    }

    async fn update_comment(&self, comment_id: i64, content: &str) -> Result<Option<Comment>> {
        let mut tables = self.tables.write().await;
        let updated = tables.comments.get_mut(&comment_id).map(|comment| {
            comment.content = content.to_string();
            comment.clone()
        });
        Ok(updated)
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.comments.contains_key(&comment_id) {
            return Ok(false);
        }

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for comment in tables.comments.values() {
            if let Some(parent_id) = comment.parent_id {
                children.entry(parent_id).or_default().push(comment.id);
            }
        }

        // Cascades like the foreign key does; `removed` stops parent cycles.
        let mut removed = HashSet::new();
        let mut pending = vec![comment_id];
        while let Some(id) = pending.pop() {
            if !removed.insert(id) {
                continue;
            }
            if let Some(replies) = children.get(&id) {
                pending.extend(replies);
            }
        }
        tables.comments.retain(|id, _| !removed.contains(id));
        Ok(true)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|comment| comment.keyset());
        Ok(comments)
    }

    async fn list_sibling_comments(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        cursor: PageCursor,
        limit: i64,
    ) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        let siblings = tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id && comment.parent_id == parent_id)
            .cloned();
        Ok(paginate(siblings, cursor, limit))
    }

    async fn count_comments(&self, post_id: i64) -> Result<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .count();
        Ok(i64::try_from(count)?)
    }
}
