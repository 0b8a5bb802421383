//! Pure state transitions applied to a blog after remote operations.

use time::OffsetDateTime;

use crate::domain::entities::BlogRecord;
use crate::domain::types::{BlogStatus, Platform};

use super::outcome::PublishOutcome;

#[derive(Debug, Clone, Copy, Default)]
pub struct BlogStatusReconciler;

impl BlogStatusReconciler {
    /// Merge successful attempts into `blog`.
    ///
    /// Any success moves the blog into `published`; `published_at` is only set
    /// on that transition. A total failure leaves status and ids untouched.
    pub fn apply_outcome(&self, blog: &mut BlogRecord, outcome: &PublishOutcome, now: OffsetDateTime) {
        for (platform, post_id) in outcome.post_ids() {
            blog.platform_post_ids.insert(platform, post_id.clone());
            if !blog.remote_post_ids.contains(&post_id) {
                blog.remote_post_ids.push(post_id);
            }
        }

        if outcome.any_success() && blog.status != BlogStatus::Published {
            blog.status = BlogStatus::Published;
            blog.published_at = Some(now);
        }

        blog.social_media_published = !blog.platform_post_ids.is_empty();
        blog.updated_at = now;
    }

    /// Commit a transition into `published` that needed no syndication.
    pub fn mark_published(&self, blog: &mut BlogRecord, now: OffsetDateTime) {
        if blog.status != BlogStatus::Published {
            blog.status = BlogStatus::Published;
            blog.published_at = Some(now);
        }
        blog.social_media_published = !blog.platform_post_ids.is_empty();
        blog.updated_at = now;
    }

    /// Reflect the deletion of `post_id` on `platform`.
    pub fn apply_remote_deletion(
        &self,
        blog: &mut BlogRecord,
        platform: Platform,
        post_id: &str,
        now: OffsetDateTime,
    ) {
        let matches_platform = blog
            .platform_post_ids
            .get(&platform)
            .is_some_and(|id| id == post_id);
        if matches_platform {
            blog.platform_post_ids.remove(&platform);
        } else {
            blog.platform_post_ids.retain(|_, id| id != post_id);
        }
        blog.remote_post_ids.retain(|id| id != post_id);

        blog.status = BlogStatus::Deactivated;
        blog.social_media_published = !blog.platform_post_ids.is_empty();
        blog.updated_at = now;
    }
}
