use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::app::pagination::SENTINEL_ID;
use crate::app::posts::DEFAULT_SEARCH_LIMIT;
use crate::domain::comment::{Comment, CommentNode};
use crate::domain::post::{Post, PostQuery, PostSort};
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

/// `?last=` reference id; absent means the newest page.
#[derive(Deserialize)]
pub struct LastQuery {
    pub last: Option<i64>,
}

impl LastQuery {
    fn reference_id(&self) -> i64 {
        self.last.unwrap_or(SENTINEL_ID)
    }
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: i64,
}

fn parse_timestamp(
    field: &str,
    value: Option<String>,
) -> Result<Option<OffsetDateTime>, AppError> {
    let Some(value) = value else {
        return Ok(None);
    };
    OffsetDateTime::parse(&value, &Rfc3339)
        .map(Some)
        .map_err(|_| AppError::bad_request(format!("{} must be an RFC 3339 timestamp", field)))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.post_store.ping().await.is_ok();
    let cache = state.cache.ping().await.is_ok();
    let status = if store && cache { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

pub async fn latest_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    let posts = state.post_service().feed_page(SENTINEL_ID).await?;
    Ok(Json(posts))
}

pub async fn next_posts(
    Path(last_post_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts = state.post_service().feed_page(last_post_id).await?;
    Ok(Json(posts))
}

pub async fn list_author_posts(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Query(query): Query<LastQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts = state
        .post_service()
        .author_page(id, query.reference_id())
        .await?;
    Ok(Json(posts))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    let query = PostQuery {
        keyword: query.keyword.filter(|keyword| !keyword.trim().is_empty()),
        from: parse_timestamp("from", query.from)?,
        to: parse_timestamp("to", query.to)?,
        sort: PostSort::from_query(query.sort.as_deref()),
        limit: query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        offset: query.offset.unwrap_or(0),
    };

    let posts = state.post_service().search(query).await?;
    Ok(Json(posts))
}

pub async fn get_post(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Post>, AppError> {
    let post = state.post_service().get_post(id).await?;
    Ok(Json(post))
}

#[derive(Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
}

pub async fn create_post(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state
        .post_service()
        .create_post(caller.user_id, payload.title, payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    Path(id): Path<i64>,
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PostRequest>,
) -> Result<Json<Post>, AppError> {
    let post = state
        .post_service()
        .update_post(id, payload.title, payload.content, caller)
        .await?;
    Ok(Json(post))
}

pub async fn delete_post(
    Path(id): Path<i64>,
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.post_service().delete_post(id, caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_comments_flat(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = state.comment_service().list_flat(id).await?;
    Ok(Json(comments))
}

pub async fn comment_tree(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CommentNode>>, AppError> {
    let tree = state.comment_service().tree(id).await?;
    Ok(Json(tree))
}

pub async fn previous_comments(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Query(query): Query<LastQuery>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = state
        .comment_service()
        .previous(id, query.reference_id())
        .await?;
    Ok(Json(comments))
}

pub async fn comment_count(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, AppError> {
    let count = state.comment_service().count(id).await?;
    Ok(Json(CountResponse { count }))
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<i64>,
}

pub async fn create_comment(
    Path(id): Path<i64>,
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state
        .comment_service()
        .create(id, payload.parent_id, payload.content, caller.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

pub async fn update_comment(
    Path(id): Path<i64>,
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let comment = state
        .comment_service()
        .update(id, payload.content, caller)
        .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    Path(id): Path<i64>,
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.comment_service().delete(id, caller).await?;
    Ok(StatusCode::NO_CONTENT)
}
