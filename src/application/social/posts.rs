//! Direct management of remote social posts and their local reconciliation.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::repos::{BlogUnitOfWork, BlogsRepo, BlogsWriteRepo, RepoError};
use crate::cache::AccessToken;
use crate::domain::entities::BlogRecord;
use crate::domain::types::Platform;

use super::credentials::CredentialError;
use super::orchestrator::{PublishDecision, PublishError, PublishOrchestrator};
use super::outcome::PublishOutcome;
use super::publisher::{PlatformPublisher, PostsPage, PublisherError, RemotePost};

pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const MAX_LIST_LIMIT: u32 = 100;
pub const MAX_MESSAGE_CHARS: usize = 63_000;
pub const MAX_COMMENT_CHARS: usize = 1_000;
pub const MAX_POST_ID_CHARS: usize = 128;

#[derive(Debug, Error)]
pub enum SocialPostError {
    #[error("platform `{platform}` is not enabled")]
    PlatformDisabled { platform: Platform },
    #[error("message must not be blank")]
    EmptyMessage,
    #[error("message exceeds {limit} characters")]
    MessageTooLong { limit: usize },
    #[error("`{post_id}` is not a valid post id")]
    InvalidPostId { post_id: String },
    #[error("blog not found")]
    BlogNotFound,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Publisher(#[from] PublisherError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("publishing to {platform} failed")]
    PublishRejected {
        platform: Platform,
        outcome: PublishOutcome,
    },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("remote post deleted but local state could not be committed: {message}")]
    Reconciliation { message: String },
}

/// Outcome of a delete-and-reconcile.
#[derive(Debug, Clone)]
pub struct DeletedPost {
    pub platform: Platform,
    pub post_id: String,
    /// The blog that referenced the post, after reconciliation.
    pub blog: Option<BlogRecord>,
}

#[derive(Debug, Clone)]
pub struct RepublishResult {
    pub blog: BlogRecord,
    pub outcome: PublishOutcome,
}

#[derive(Debug, Clone)]
pub struct CredentialCheck {
    pub platform: Platform,
    pub valid: bool,
    pub detail: Option<String>,
}

pub struct SocialPostService {
    reader: Arc<dyn BlogsRepo>,
    writer: Arc<dyn BlogsWriteRepo>,
    orchestrator: Arc<PublishOrchestrator>,
}

impl SocialPostService {
    pub fn new(
        reader: Arc<dyn BlogsRepo>,
        writer: Arc<dyn BlogsWriteRepo>,
        orchestrator: Arc<PublishOrchestrator>,
    ) -> Self {
        Self {
            reader,
            writer,
            orchestrator,
        }
    }

    pub fn enabled_platforms(&self) -> Vec<Platform> {
        self.orchestrator.publishers().platforms()
    }

    pub async fn list_posts(
        &self,
        platform: Platform,
        limit: Option<u32>,
        after: Option<&str>,
    ) -> Result<PostsPage, SocialPostError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let (publisher, token) = self.connect(platform).await?;
        Ok(publisher.list_posts(&token, limit, after).await?)
    }

    pub async fn get_post(
        &self,
        platform: Platform,
        post_id: &str,
    ) -> Result<RemotePost, SocialPostError> {
        let post_id = checked_post_id(post_id)?;
        let (publisher, token) = self.connect(platform).await?;
        Ok(publisher.get_post(&token, post_id).await?)
    }

    pub async fn update_message(
        &self,
        platform: Platform,
        post_id: &str,
        message: &str,
    ) -> Result<(), SocialPostError> {
        let post_id = checked_post_id(post_id)?;
        let message = checked_message(message, MAX_MESSAGE_CHARS)?;
        let (publisher, token) = self.connect(platform).await?;
        publisher.update_message(&token, post_id, message).await?;
        info!(
            target = "blogcast::social::posts",
            platform = platform.as_str(),
            post_id,
            "Updated remote post message"
        );
        Ok(())
    }

    pub async fn comment(
        &self,
        platform: Platform,
        post_id: &str,
        message: &str,
    ) -> Result<String, SocialPostError> {
        let post_id = checked_post_id(post_id)?;
        let message = checked_message(message, MAX_COMMENT_CHARS)?;
        let (publisher, token) = self.connect(platform).await?;
        Ok(publisher.comment(&token, post_id, message).await?)
    }

    pub async fn boost(&self, platform: Platform, post_id: &str) -> Result<(), SocialPostError> {
        let post_id = checked_post_id(post_id)?;
        let (publisher, token) = self.connect(platform).await?;
        publisher.boost(&token, post_id).await?;
        Ok(())
    }

    /// Delete the remote post and reconcile the owning blog in one transaction.
    ///
    /// The blog row is locked and rewritten first; the transaction commits only
    /// after the remote delete succeeds.
    pub async fn delete_post(
        &self,
        platform: Platform,
        post_id: &str,
    ) -> Result<DeletedPost, SocialPostError> {
        let post_id = checked_post_id(post_id)?;
        let (publisher, token) = self.connect(platform).await?;

        let mut unit = self.writer.begin_unit().await?;

        let reconciled = match unit.lock_by_remote_post_id(post_id).await {
            Ok(Some(mut blog)) => {
                self.orchestrator.reconciler().apply_remote_deletion(
                    &mut blog,
                    platform,
                    post_id,
                    OffsetDateTime::now_utc(),
                );
                if let Err(err) = unit.save_blog(&blog).await {
                    discard(unit, post_id).await;
                    return Err(err.into());
                }
                Some(blog)
            }
            Ok(None) => None,
            Err(err) => {
                discard(unit, post_id).await;
                return Err(err.into());
            }
        };

        if let Err(err) = publisher.delete(&token, post_id).await {
            discard(unit, post_id).await;
            return Err(err.into());
        }

        if let Err(commit_err) = unit.commit().await {
            error!(
                target = "blogcast::social::posts",
                platform = platform.as_str(),
                post_id,
                error = %commit_err,
                "Remote post deleted but reconciliation commit failed"
            );
            if let Some(blog) = reconciled.as_ref() {
                match self.writer.save_blog(blog).await {
                    Ok(_) => info!(
                        target = "blogcast::social::posts",
                        blog_id = %blog.id,
                        "Compensating reconciliation write succeeded"
                    ),
                    Err(err) => error!(
                        target = "blogcast::social::posts",
                        blog_id = %blog.id,
                        error = %err,
                        "Compensating reconciliation write failed"
                    ),
                }
            }
            return Err(SocialPostError::Reconciliation {
                message: commit_err.to_string(),
            });
        }

        info!(
            target = "blogcast::social::posts",
            platform = platform.as_str(),
            post_id,
            blog_id = ?reconciled.as_ref().map(|blog| blog.id),
            "Deleted remote post"
        );

        Ok(DeletedPost {
            platform,
            post_id: post_id.to_string(),
            blog: reconciled,
        })
    }

    /// Publish one platform again for a published or deactivated blog.
    pub async fn republish(
        &self,
        blog_id: Uuid,
        platform: Platform,
    ) -> Result<RepublishResult, SocialPostError> {
        self.ensure_enabled(platform)?;
        let blog = self
            .reader
            .find_by_id(blog_id)
            .await?
            .ok_or(SocialPostError::BlogNotFound)?;

        match self
            .orchestrator
            .republish(&blog, platform, OffsetDateTime::now_utc())
            .await?
        {
            PublishDecision::Commit { blog, outcome } => {
                let blog = self.writer.save_blog(&blog).await?;
                Ok(RepublishResult { blog, outcome })
            }
            PublishDecision::Reject { outcome } => {
                Err(SocialPostError::PublishRejected { platform, outcome })
            }
        }
    }

    /// Resolve credentials and probe the platform with a one-item listing.
    pub async fn verify_credentials(&self, platform: Platform) -> CredentialCheck {
        let probe = async {
            let (publisher, token) = self.connect(platform).await?;
            match publisher.list_posts(&token, 1, None).await {
                Ok(_) | Err(PublisherError::Unsupported { .. }) => Ok(()),
                Err(err) => Err(SocialPostError::from(err)),
            }
        };

        match probe.await {
            Ok(()) => CredentialCheck {
                platform,
                valid: true,
                detail: None,
            },
            Err(err) => {
                warn!(
                    target = "blogcast::social::posts",
                    platform = platform.as_str(),
                    error = %err,
                    "Credential verification failed"
                );
                CredentialCheck {
                    platform,
                    valid: false,
                    detail: Some(err.to_string()),
                }
            }
        }
    }

    fn ensure_enabled(&self, platform: Platform) -> Result<(), SocialPostError> {
        if self.orchestrator.publishers().contains(platform) {
            Ok(())
        } else {
            Err(SocialPostError::PlatformDisabled { platform })
        }
    }

    async fn connect(
        &self,
        platform: Platform,
    ) -> Result<(Arc<dyn PlatformPublisher>, AccessToken), SocialPostError> {
        let publisher = self
            .orchestrator
            .publishers()
            .get(platform)
            .ok_or(SocialPostError::PlatformDisabled { platform })?;
        let token = self.orchestrator.resolver().resolve(platform).await?;
        Ok((publisher, token))
    }
}

async fn discard(unit: Box<dyn BlogUnitOfWork>, post_id: &str) {
    if let Err(err) = unit.rollback().await {
        warn!(
            target = "blogcast::social::posts",
            post_id,
            error = %err,
            "Failed to roll back reconciliation transaction"
        );
    }
}

/// Remote ids are opaque tokens such as `123_456` or `urn:li:share:1`; they
/// travel as a single path segment and never contain separators.
fn checked_post_id(post_id: &str) -> Result<&str, SocialPostError> {
    let valid = !post_id.is_empty()
        && post_id.len() <= MAX_POST_ID_CHARS
        && post_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':'));
    if valid {
        Ok(post_id)
    } else {
        Err(SocialPostError::InvalidPostId {
            post_id: post_id.to_string(),
        })
    }
}

fn checked_message(message: &str, limit: usize) -> Result<&str, SocialPostError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(SocialPostError::EmptyMessage);
    }
    if trimmed.chars().count() > limit {
        return Err(SocialPostError::MessageTooLong { limit });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_ids_accept_platform_id_shapes() {
        for id in ["123_456", "17841400000000000", "urn:li:share:1", "fb-1"] {
            assert_eq!(checked_post_id(id).expect("valid id"), id);
        }
    }

    #[test]
    fn post_ids_reject_urls_and_traversal() {
        for id in [
            "",
            "http://attacker.example/steal",
            "../me/accounts",
            "..",
            "123?fields=access_token",
            "123#frag",
            "123%2F456",
            "123 456",
        ] {
            assert!(
                matches!(
                    checked_post_id(id),
                    Err(SocialPostError::InvalidPostId { .. })
                ),
                "accepted `{id}`"
            );
        }
        assert!(checked_post_id(&"1".repeat(MAX_POST_ID_CHARS + 1)).is_err());
    }
}
