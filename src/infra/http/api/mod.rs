pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/blogs", post(handlers::create_blog))
        .route("/api/blogs/{id}", put(handlers::update_blog))
        .route("/api/blogs/{id}/social/retry", post(handlers::retry_social))
        .route(
            "/api/social-media-platforms",
            get(handlers::list_platforms),
        )
        .route("/api/social-posts", get(handlers::list_posts))
        .route(
            "/api/social-posts/republish/{blog_id}",
            post(handlers::republish_blog),
        )
        .route(
            "/api/social-posts/{platform}/{post_id}",
            get(handlers::get_post)
                .put(handlers::update_post_message)
                .delete(handlers::delete_post),
        )
        .route(
            "/api/social-posts/{platform}/{post_id}/comments",
            post(handlers::comment_on_post),
        )
        .route(
            "/api/social-posts/{platform}/{post_id}/boost",
            post(handlers::boost_post),
        )
        .route(
            "/api/social-credentials/{platform}",
            get(handlers::verify_credentials),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
