//! Blog lifecycle handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::blogs::{BlogChange, CreateBlogCommand, UpdateBlogCommand};

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

fn scheduled_at(raw: Option<&str>) -> Result<Option<OffsetDateTime>, ApiError> {
    raw.filter(|value| !value.trim().is_empty())
        .map(parse_timestamp)
        .transpose()
        .map_err(|err| {
            ApiError::validation(
                "Field `scheduled_at` must be an RFC 3339 timestamp",
                Some(err.to_string()),
            )
        })
}

fn envelope(change: BlogChange, message: Option<&'static str>) -> BlogEnvelope {
    BlogEnvelope {
        message,
        publish: change.publish.as_ref().map(OutcomeResponse::from),
        data: BlogResponse::from(change.blog),
    }
}

pub async fn create_blog(
    State(state): State<ApiState>,
    Json(payload): Json<BlogCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateBlogCommand {
        scheduled_at: scheduled_at(payload.scheduled_at.as_deref())?,
        title: payload.title,
        article_type: payload.article_type,
        short_description: payload.short_description,
        body: payload.body,
        image_url: payload.image_url,
        video_url: payload.video_url,
        document_url: payload.document_url,
        status: payload.status,
        platforms: payload.platforms,
    };

    let change = state.blogs.create(command).await?;
    Ok((StatusCode::CREATED, Json(envelope(change, None))))
}

pub async fn update_blog(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BlogUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateBlogCommand {
        id,
        scheduled_at: scheduled_at(payload.scheduled_at.as_deref())?,
        title: payload.title,
        article_type: payload.article_type,
        short_description: payload.short_description,
        body: payload.body,
        image_url: payload.image_url,
        video_url: payload.video_url,
        document_url: payload.document_url,
        status: payload.status,
        platforms: payload.platforms,
    };

    let change = state.blogs.update(command).await?;
    Ok(Json(envelope(change, Some("Blog updated successfully"))))
}

pub async fn retry_social(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let change = state.blogs.retry_social(id).await?;
    Ok(Json(envelope(change, None)))
}
