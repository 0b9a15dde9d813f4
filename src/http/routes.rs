use axum::{routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            get(handlers::latest_posts).post(handlers::create_post),
        )
        .route("/posts/next/:last_post_id", get(handlers::next_posts))
        .route("/posts/search", get(handlers::search_posts))
        .route(
            "/posts/:id",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/users/:id/posts", get(handlers::list_author_posts))
}

pub fn comments() -> Router<AppState> {
    Router::new()
        .route("/posts/:id/comments", post(handlers::create_comment))
        .route("/posts/:id/comments/flat", get(handlers::list_comments_flat))
        .route("/posts/:id/comments/tree", get(handlers::comment_tree))
        .route(
            "/posts/:id/comments/previous",
            get(handlers::previous_comments),
        )
        .route("/posts/:id/comments/count", get(handlers::comment_count))
        .route(
            "/comments/:id",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
}
