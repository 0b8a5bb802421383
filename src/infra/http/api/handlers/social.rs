//! Social post management handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::domain::types::Platform;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

use super::parse_platform;

pub async fn list_platforms(State(state): State<ApiState>) -> impl IntoResponse {
    let data = state
        .social
        .enabled_platforms()
        .into_iter()
        .map(PlatformResponse::from)
        .collect::<Vec<_>>();
    Json(DataEnvelope { data })
}

pub async fn list_posts(
    State(state): State<ApiState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = match query.platform.as_deref() {
        Some(raw) => parse_platform(raw)?,
        None => Platform::Facebook,
    };
    let page = state
        .social
        .list_posts(platform, query.limit, query.after.as_deref())
        .await?;
    Ok(Json(PostListResponse::from(page)))
}

pub async fn get_post(
    State(state): State<ApiState>,
    Path((platform, post_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = parse_platform(&platform)?;
    let post = state.social.get_post(platform, &post_id).await?;
    Ok(Json(DataEnvelope { data: post }))
}

pub async fn update_post_message(
    State(state): State<ApiState>,
    Path((platform, post_id)): Path<(String, String)>,
    Json(payload): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = parse_platform(&platform)?;
    state
        .social
        .update_message(platform, &post_id, &payload.message)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Path((platform, post_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = parse_platform(&platform)?;
    let deleted = state.social.delete_post(platform, &post_id).await?;
    Ok(Json(DeleteResponse {
        success: true,
        blog: deleted.blog.map(BlogResponse::from),
    }))
}

pub async fn comment_on_post(
    State(state): State<ApiState>,
    Path((platform, post_id)): Path<(String, String)>,
    Json(payload): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = parse_platform(&platform)?;
    let id = state
        .social
        .comment(platform, &post_id, &payload.message)
        .await?;
    Ok(Json(CommentResponse { success: true, id }))
}

pub async fn boost_post(
    State(state): State<ApiState>,
    Path((platform, post_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = parse_platform(&platform)?;
    state.social.boost(platform, &post_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn republish_blog(
    State(state): State<ApiState>,
    Path(blog_id): Path<Uuid>,
    Query(query): Query<RepublishQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = parse_platform(&query.platform)?;
    let result = state.social.republish(blog_id, platform).await?;
    Ok(Json(BlogEnvelope {
        message: None,
        publish: Some(OutcomeResponse::from(&result.outcome)),
        data: BlogResponse::from(result.blog),
    }))
}

pub async fn verify_credentials(
    State(state): State<ApiState>,
    Path(platform): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = parse_platform(&platform)?;
    let check = state.social.verify_credentials(platform).await;
    Ok(Json(CredentialResponse::from(check)))
}
