use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::application::social::{PublishError, PublishOutcome};
use crate::domain::entities::BlogRecord;
use crate::domain::types::{BlogStatus, Platform};

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_TYPE_CHARS: usize = 255;
pub const MAX_SHORT_DESCRIPTION_CHARS: usize = 500;
pub const MAX_BODY_CHARS: usize = 63_000;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("field `{field}` is invalid: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("blog not found")]
    NotFound,
    #[error("invalid status transition from `{from}` to `{to}`; allowed transitions: {allowed}")]
    InvalidTransition {
        from: BlogStatus,
        to: BlogStatus,
        allowed: String,
    },
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("publishing failed on every selected platform; status not updated")]
    PublishRejected { outcome: PublishOutcome },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl BlogError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBlogCommand {
    pub title: String,
    pub article_type: String,
    pub short_description: String,
    pub body: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub document_url: Option<String>,
    pub status: BlogStatus,
    pub platforms: Vec<Platform>,
    pub scheduled_at: Option<OffsetDateTime>,
}

/// Partial update; `None` keeps the stored value. An empty string clears an
/// optional URL.
#[derive(Debug, Clone, Default)]
pub struct UpdateBlogCommand {
    pub id: Uuid,
    pub title: Option<String>,
    pub article_type: Option<String>,
    pub short_description: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub document_url: Option<String>,
    pub status: Option<BlogStatus>,
    pub platforms: Option<Vec<Platform>>,
    pub scheduled_at: Option<OffsetDateTime>,
}

/// Stored blog plus the publish outcome when the change triggered one.
#[derive(Debug, Clone)]
pub struct BlogChange {
    pub blog: BlogRecord,
    pub publish: Option<PublishOutcome>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub due: usize,
    pub published: Vec<Uuid>,
    pub rejected: Vec<Uuid>,
    pub errored: Vec<Uuid>,
}

pub fn ensure_text(
    value: &str,
    field: &'static str,
    max_chars: usize,
    required: bool,
) -> Result<(), BlogError> {
    if required && value.trim().is_empty() {
        return Err(BlogError::validation(field, "must not be blank"));
    }
    if value.chars().count() > max_chars {
        return Err(BlogError::validation(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(())
}

pub fn ensure_absolute_url(value: &str, field: &'static str) -> Result<(), BlogError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(BlogError::validation(field, "must be an absolute http(s) URL")),
    }
}

/// Uploaded documents are stored as site-relative paths.
pub fn ensure_document_reference(value: &str) -> Result<(), BlogError> {
    if value.starts_with('/') && !value.starts_with("//") {
        return Ok(());
    }
    ensure_absolute_url(value, "document_url")
}

/// Trimmed value, or `None` for blank input.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// Platforms with duplicates removed, keeping first occurrence order.
pub fn dedup_platforms(platforms: &[Platform]) -> Vec<Platform> {
    let mut unique = Vec::with_capacity(platforms.len());
    for platform in platforms {
        if !unique.contains(platform) {
            unique.push(*platform);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_limits_count_characters_not_bytes() {
        let title = "é".repeat(MAX_TITLE_CHARS);
        assert!(ensure_text(&title, "title", MAX_TITLE_CHARS, true).is_ok());

        let too_long = "é".repeat(MAX_TITLE_CHARS + 1);
        assert!(matches!(
            ensure_text(&too_long, "title", MAX_TITLE_CHARS, true),
            Err(BlogError::Validation { field: "title", .. })
        ));
    }

    #[test]
    fn blank_required_text_is_rejected() {
        assert!(ensure_text("   ", "body", MAX_BODY_CHARS, true).is_err());
        assert!(ensure_text("", "image_url", 10, false).is_ok());
    }

    #[test]
    fn document_reference_accepts_paths_and_urls() {
        assert!(ensure_document_reference("/storage/documents/report.pdf").is_ok());
        assert!(ensure_document_reference("https://cdn.example.com/report.pdf").is_ok());
        assert!(ensure_document_reference("//evil.example.com/x").is_err());
        assert!(ensure_document_reference("report.pdf").is_err());
    }

    #[test]
    fn platforms_are_deduplicated_in_order() {
        let platforms = [
            Platform::Linkedin,
            Platform::Facebook,
            Platform::Linkedin,
        ];
        assert_eq!(
            dedup_platforms(&platforms),
            vec![Platform::Linkedin, Platform::Facebook]
        );
    }
}
