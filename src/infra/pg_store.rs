use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::app::pagination::PageCursor;
use crate::domain::comment::{Comment, NewComment};
use crate::domain::post::{NewPost, Post, PostQuery};
use crate::infra::db::Db;
use crate::infra::store::{CommentStore, PostScope, PostStore};

const POST_COLUMNS: &str = "id, author_id, title, content, created_at";
const COMMENT_COLUMNS: &str = "id, post_id, author_id, parent_id, content, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn author_exists(&self, author_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
            .bind(author_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(exists)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let row = sqlx::query(&format!(
            "INSERT INTO posts (author_id, title, content) VALUES ($1, $2, $3) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(post.author_id)
        .bind(post.title)
        .bind(post.content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(post_from_row(&row))
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn update_post(&self, post_id: i64, title: &str, content: &str) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "UPDATE posts SET title = $2, content = $3 WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(post_id)
        .bind(title)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        cursor: PageCursor,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let rows = match cursor {
            PageCursor::Before(reference) => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} FROM posts \
                     WHERE ($1::BIGINT IS NULL OR author_id = $1) \
                       AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $4"
                ))
                .bind(scope.author_id())
                .bind(reference.created_at)
                .bind(reference.id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            PageCursor::Latest => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} FROM posts \
                     WHERE ($1::BIGINT IS NULL OR author_id = $1) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2"
                ))
                .bind(scope.author_id())
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn search_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        // ORDER BY comes from a closed enum, never from caller text.
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE ($1::TEXT IS NULL OR strpos(title, $1) > 0 OR strpos(content, $1) > 0) \
               AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2) \
               AND ($3::TIMESTAMPTZ IS NULL OR created_at <= $3) \
             ORDER BY {} \
             LIMIT $4 OFFSET $5",
            query.sort.as_sql()
        ))
        .bind(query.keyword.as_deref().filter(|k| !k.is_empty()))
        .bind(query.from)
        .bind(query.to)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let row = sqlx::query(&format!(
            "INSERT INTO comments (post_id, author_id, parent_id, content) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.parent_id)
        .bind(comment.content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(comment_from_row(&row))
    }

    async fn find_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"))
            .bind(comment_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    async fn update_comment(&self, comment_id: i64, content: &str) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!(
            "UPDATE comments SET content = $2 WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment_id)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<bool> {
        // parent_id is ON DELETE CASCADE, so the reply subtree goes too.
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE post_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn list_sibling_comments(
        &self,
        post_id: i64,
        parent_id: Option<i64>,
        cursor: PageCursor,
        limit: i64,
    ) -> Result<Vec<Comment>> {
        let rows = match cursor {
            PageCursor::Before(reference) => {
                sqlx::query(&format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments \
                     WHERE post_id = $1 \
                       AND parent_id IS NOT DISTINCT FROM $2 \
                       AND (created_at < $3 OR (created_at = $3 AND id < $4)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $5"
                ))
                .bind(post_id)
                .bind(parent_id)
                .bind(reference.created_at)
                .bind(reference.id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            PageCursor::Latest => {
                sqlx::query(&format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments \
                     WHERE post_id = $1 \
                       AND parent_id IS NOT DISTINCT FROM $2 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3"
                ))
                .bind(post_id)
                .bind(parent_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn count_comments(&self, post_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }
}
