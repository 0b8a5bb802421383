use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::application::social::{
    AttemptResult, CredentialCheck, PostsPage, PublishOutcome, RemotePost,
};
use crate::domain::entities::BlogRecord;
use crate::domain::types::{BlogStatus, Platform};

fn default_blog_status() -> BlogStatus {
    BlogStatus::Inactive
}

pub fn format_timestamp(value: OffsetDateTime) -> Option<String> {
    value.format(&Rfc3339).ok()
}

pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BlogCreateRequest {
    pub title: String,
    pub article_type: String,
    pub short_description: String,
    pub body: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub document_url: Option<String>,
    #[serde(default = "default_blog_status")]
    pub status: BlogStatus,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    /// RFC 3339 timestamp.
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BlogUpdateRequest {
    pub title: Option<String>,
    pub article_type: Option<String>,
    pub short_description: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub document_url: Option<String>,
    pub status: Option<BlogStatus>,
    pub platforms: Option<Vec<Platform>>,
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub article_type: String,
    pub short_description: String,
    pub body: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub document_url: Option<String>,
    pub status: BlogStatus,
    pub platforms: Vec<Platform>,
    pub scheduled_at: Option<String>,
    pub published_at: Option<String>,
    pub social_media_published: bool,
    pub platform_post_ids: BTreeMap<Platform, String>,
    pub remote_post_ids: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<BlogRecord> for BlogResponse {
    fn from(blog: BlogRecord) -> Self {
        Self {
            id: blog.id,
            slug: blog.slug,
            title: blog.title,
            article_type: blog.article_type,
            short_description: blog.short_description,
            body: blog.body,
            image_url: blog.image_url,
            video_url: blog.video_url,
            document_url: blog.document_url,
            status: blog.status,
            platforms: blog.platforms,
            scheduled_at: blog.scheduled_at.and_then(format_timestamp),
            published_at: blog.published_at.and_then(format_timestamp),
            social_media_published: blog.social_media_published,
            platform_post_ids: blog.platform_post_ids,
            remote_post_ids: blog.remote_post_ids,
            created_at: format_timestamp(blog.created_at),
            updated_at: format_timestamp(blog.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptResponse {
    pub platform: Platform,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeResponse {
    pub success: bool,
    pub partial: bool,
    pub results: Vec<AttemptResponse>,
}

impl From<&PublishOutcome> for OutcomeResponse {
    fn from(outcome: &PublishOutcome) -> Self {
        let results = outcome
            .attempts
            .iter()
            .map(|attempt| match &attempt.result {
                AttemptResult::Published { post_id } => AttemptResponse {
                    platform: attempt.platform,
                    success: true,
                    post_id: Some(post_id.clone()),
                    failure: None,
                    reason: None,
                },
                AttemptResult::Failed { kind, reason } => AttemptResponse {
                    platform: attempt.platform,
                    success: false,
                    post_id: None,
                    failure: Some(kind.as_str().to_string()),
                    reason: Some(reason.clone()),
                },
            })
            .collect();
        Self {
            success: outcome.any_success(),
            partial: outcome.is_partial(),
            results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: BlogResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<OutcomeResponse>,
}

#[derive(Debug, Serialize)]
pub struct PlatformResponse {
    pub id: Platform,
    pub name: &'static str,
}

impl From<Platform> for PlatformResponse {
    fn from(platform: Platform) -> Self {
        Self {
            id: platform,
            name: platform.display_name(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub platform: Option<String>,
    pub limit: Option<u32>,
    pub after: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub data: Vec<RemotePost>,
    pub paging: PagingResponse,
}

#[derive(Debug, Serialize)]
pub struct PagingResponse {
    pub after: Option<String>,
}

impl From<PostsPage> for PostListResponse {
    fn from(page: PostsPage) -> Self {
        Self {
            data: page.posts,
            paging: PagingResponse {
                after: page.next_cursor,
            },
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog: Option<BlogResponse>,
}

#[derive(Debug, Deserialize)]
pub struct RepublishQuery {
    pub platform: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub platform: Platform,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<CredentialCheck> for CredentialResponse {
    fn from(check: CredentialCheck) -> Self {
        Self {
            platform: check.platform,
            valid: check.valid,
            detail: check.detail,
        }
    }
}
