//! Domain entities mirrored from persistent storage.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{BlogStatus, Platform};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogRecord {
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
    /// Platforms the author enabled for syndication.
    pub platforms: Vec<Platform>,
    pub scheduled_at: Option<OffsetDateTime>,
    pub published_at: Option<OffsetDateTime>,
    pub social_media_published: bool,
    /// Remote post id per platform; only platforms that were actually published to.
    pub platform_post_ids: BTreeMap<Platform, String>,
    /// Deduplicated list of every remote post id currently attached to the blog.
    pub remote_post_ids: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl BlogRecord {
    /// Enabled platforms that do not have a recorded remote post yet.
    pub fn pending_platforms(&self) -> Vec<Platform> {
        let mut pending = Vec::new();
        for platform in &self.platforms {
            if !self.platform_post_ids.contains_key(platform) && !pending.contains(platform) {
                pending.push(*platform);
            }
        }
        pending
    }

    pub fn owns_remote_post(&self, post_id: &str) -> bool {
        self.remote_post_ids.iter().any(|id| id == post_id)
            || self.platform_post_ids.values().any(|id| id == post_id)
    }
}

/// One append-only row describing a single platform publish attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishLogRecord {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub platform: Platform,
    pub platform_post_id: Option<String>,
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
    pub created_at: OffsetDateTime,
}
