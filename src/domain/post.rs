use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub content: String,
}

/// Column a post search is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    CreatedAtAsc,
    #[default]
    CreatedAtDesc,
    TitleAsc,
    TitleDesc,
}

impl PostSort {
    /// Parses the `sort` query value; unknown values fall back to newest first.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("createdAt") => Self::CreatedAtAsc,
            Some("-createdAt") => Self::CreatedAtDesc,
            Some("title") => Self::TitleAsc,
            Some("-title") => Self::TitleDesc,
            _ => Self::CreatedAtDesc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::CreatedAtAsc => "created_at ASC, id ASC",
            Self::CreatedAtDesc => "created_at DESC, id DESC",
            Self::TitleAsc => "title ASC, id ASC",
            Self::TitleDesc => "title DESC, id DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub keyword: Option<String>,
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
    pub sort: PostSort,
    pub limit: i64,
    pub offset: i64,
}

impl PostQuery {
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            if !post.title.contains(keyword) && !post.content.contains(keyword) {
                return false;
            }
        }
        if self.from.is_some_and(|from| post.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| post.created_at > to) {
            return false;
        }
        true
    }
}
