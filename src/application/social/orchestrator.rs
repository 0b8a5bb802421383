//! Publishing pipeline: validate, resolve credentials, format, publish,
//! log and reconcile.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::repos::{NewPublishLog, PublishLogRepo, RepoError};
use crate::cache::AccessToken;
use crate::domain::entities::BlogRecord;
use crate::domain::types::{BlogStatus, Platform};

use super::credentials::CredentialResolver;
use super::formatter::{ContentFormatter, strip_html};
use super::outcome::{AttemptResult, FailureKind, PublishAttempt, PublishOutcome};
use super::publisher::{PublishContent, PublishReceipt, PublisherError, PublisherRegistry};
use super::reconciler::BlogStatusReconciler;

pub const METRIC_PUBLISH_ATTEMPT: &str = "blogcast_publish_attempt_total";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("field `{field}` must not be blank")]
    Validation { field: &'static str },
    #[error("every enabled platform already has a published post")]
    NothingToRetry,
    #[error("cannot {operation} a blog in status `{status}`")]
    InvalidState {
        operation: &'static str,
        status: BlogStatus,
    },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Result of an attempt to move a blog into `published`.
#[derive(Debug, Clone)]
pub enum PublishDecision {
    /// The reconciled blog should be persisted.
    Commit {
        blog: BlogRecord,
        outcome: PublishOutcome,
    },
    /// Every requested platform failed; the blog must not change status.
    Reject { outcome: PublishOutcome },
}

pub struct PublishOrchestrator {
    resolver: Arc<CredentialResolver>,
    publishers: PublisherRegistry,
    formatter: ContentFormatter,
    logs: Arc<dyn PublishLogRepo>,
    reconciler: BlogStatusReconciler,
    publish_timeout: Duration,
}

impl PublishOrchestrator {
    pub fn new(
        resolver: Arc<CredentialResolver>,
        publishers: PublisherRegistry,
        formatter: ContentFormatter,
        logs: Arc<dyn PublishLogRepo>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            publishers,
            formatter,
            logs,
            reconciler: BlogStatusReconciler,
            publish_timeout,
        }
    }

    pub fn publishers(&self) -> &PublisherRegistry {
        &self.publishers
    }

    pub fn resolver(&self) -> &Arc<CredentialResolver> {
        &self.resolver
    }

    pub fn reconciler(&self) -> BlogStatusReconciler {
        self.reconciler
    }

    pub fn validate(blog: &BlogRecord) -> Result<(), PublishError> {
        if blog.title.trim().is_empty() {
            return Err(PublishError::Validation { field: "title" });
        }
        if blog.short_description.trim().is_empty() {
            return Err(PublishError::Validation {
                field: "short_description",
            });
        }
        if strip_html(&blog.body).is_empty() {
            return Err(PublishError::Validation { field: "body" });
        }
        Ok(())
    }

    /// Publish `blog` to each platform once and log every attempt.
    ///
    /// Platforms run concurrently, each bounded by the publish timeout.
    /// Duplicates are collapsed, keeping first occurrence order.
    pub async fn publish_blog_to_platforms(
        &self,
        blog: &BlogRecord,
        platforms: &[Platform],
    ) -> Result<PublishOutcome, PublishError> {
        Self::validate(blog)?;

        let mut requested: Vec<Platform> = Vec::with_capacity(platforms.len());
        for platform in platforms {
            if !requested.contains(platform) {
                requested.push(*platform);
            }
        }

        info!(
            target = "blogcast::social::orchestrator",
            blog_id = %blog.id,
            platforms = ?requested,
            "Publishing blog to social platforms"
        );

        let attempts = join_all(
            requested
                .iter()
                .map(|platform| self.attempt_platform(blog, *platform)),
        )
        .await;

        let outcome = PublishOutcome { attempts };
        self.append_logs(blog, &outcome).await;
        Ok(outcome)
    }

    /// Transition into `published`, gated on at least one platform succeeding.
    pub async fn first_publish(
        &self,
        blog: &BlogRecord,
        now: OffsetDateTime,
    ) -> Result<PublishDecision, PublishError> {
        if blog.platforms.is_empty() {
            let mut next = blog.clone();
            self.reconciler.mark_published(&mut next, now);
            return Ok(PublishDecision::Commit {
                blog: next,
                outcome: PublishOutcome::default(),
            });
        }

        let outcome = self
            .publish_blog_to_platforms(blog, &blog.platforms)
            .await?;
        Ok(self.decide(blog, outcome, now))
    }

    /// Re-attempt enabled platforms that have no recorded post.
    pub async fn retry(
        &self,
        blog: &BlogRecord,
        now: OffsetDateTime,
    ) -> Result<PublishDecision, PublishError> {
        if blog.status != BlogStatus::Published {
            return Err(PublishError::InvalidState {
                operation: "retry",
                status: blog.status,
            });
        }

        let pending = blog.pending_platforms();
        if pending.is_empty() {
            return Err(PublishError::NothingToRetry);
        }

        let outcome = self.publish_blog_to_platforms(blog, &pending).await?;
        Ok(self.decide(blog, outcome, now))
    }

    /// Publish a single platform for a published or deactivated blog.
    pub async fn republish(
        &self,
        blog: &BlogRecord,
        platform: Platform,
        now: OffsetDateTime,
    ) -> Result<PublishDecision, PublishError> {
        if !matches!(blog.status, BlogStatus::Published | BlogStatus::Deactivated) {
            return Err(PublishError::InvalidState {
                operation: "republish",
                status: blog.status,
            });
        }

        let outcome = self.publish_blog_to_platforms(blog, &[platform]).await?;
        Ok(self.decide(blog, outcome, now))
    }

    fn decide(
        &self,
        blog: &BlogRecord,
        outcome: PublishOutcome,
        now: OffsetDateTime,
    ) -> PublishDecision {
        if !outcome.any_success() {
            return PublishDecision::Reject { outcome };
        }
        let mut next = blog.clone();
        self.reconciler.apply_outcome(&mut next, &outcome, now);
        PublishDecision::Commit {
            blog: next,
            outcome,
        }
    }

    async fn attempt_platform(&self, blog: &BlogRecord, platform: Platform) -> PublishAttempt {
        let Some(publisher) = self.publishers.get(platform) else {
            return finish(
                blog,
                platform,
                String::new(),
                None,
                Err(PublisherError::unsupported(platform, "publish")),
            );
        };

        let token = match self.resolver.resolve(platform).await {
            Ok(token) => token,
            Err(err) => return finish(blog, platform, String::new(), None, Err(err.into())),
        };

        let message = self
            .formatter
            .format_blog(blog, publisher.character_limit());
        let content = PublishContent {
            message: message.clone(),
            link: self.formatter.article_url(&blog.slug),
            image_url: blog
                .image_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
        };

        let result = tokio::time::timeout(self.publish_timeout, publisher.publish(&token, &content))
            .await;

        match result {
            Ok(published) => finish(blog, platform, message, Some(token), published),
            Err(_) => {
                warn!(
                    target = "blogcast::social::orchestrator",
                    blog_id = %blog.id,
                    platform = platform.as_str(),
                    timeout_secs = self.publish_timeout.as_secs(),
                    "Platform publish timed out"
                );
                let attempt = PublishAttempt {
                    platform,
                    payload: message,
                    token: Some(token),
                    result: AttemptResult::Failed {
                        kind: FailureKind::Timeout,
                        reason: format!(
                            "publish did not finish within {}s",
                            self.publish_timeout.as_secs()
                        ),
                    },
                    response: None,
                    attempted_at: OffsetDateTime::now_utc(),
                };
                record_attempt_metric(&attempt);
                attempt
            }
        }
    }

    async fn append_logs(&self, blog: &BlogRecord, outcome: &PublishOutcome) {
        for attempt in &outcome.attempts {
            let entry = NewPublishLog {
                blog_id: blog.id,
                platform: attempt.platform,
                platform_post_id: attempt.post_id().map(str::to_string),
                success: attempt.is_success(),
                response: attempt.response.clone(),
                error: attempt.failure_reason().map(str::to_string),
            };
            if let Err(err) = self.logs.append_attempt(entry).await {
                warn!(
                    target = "blogcast::social::orchestrator",
                    blog_id = %blog.id,
                    platform = attempt.platform.as_str(),
                    error = %err,
                    "Failed to append publish log entry"
                );
            }
        }
    }
}

fn finish(
    blog: &BlogRecord,
    platform: Platform,
    payload: String,
    token: Option<AccessToken>,
    result: Result<PublishReceipt, PublisherError>,
) -> PublishAttempt {
    let attempt = match result {
        Ok(receipt) => {
            info!(
                target = "blogcast::social::orchestrator",
                blog_id = %blog.id,
                platform = platform.as_str(),
                post_id = %receipt.post_id,
                "Published blog to platform"
            );
            PublishAttempt {
                platform,
                payload,
                token,
                result: AttemptResult::Published {
                    post_id: receipt.post_id,
                },
                response: Some(receipt.response),
                attempted_at: OffsetDateTime::now_utc(),
            }
        }
        Err(err) => {
            let kind = FailureKind::of(&err);
            warn!(
                target = "blogcast::social::orchestrator",
                blog_id = %blog.id,
                platform = platform.as_str(),
                kind = kind.as_str(),
                error = %err,
                "Platform publish failed"
            );
            PublishAttempt {
                platform,
                payload,
                token,
                response: err.response().map(str::to_string),
                result: AttemptResult::Failed {
                    kind,
                    reason: err.to_string(),
                },
                attempted_at: OffsetDateTime::now_utc(),
            }
        }
    };
    record_attempt_metric(&attempt);
    attempt
}

fn record_attempt_metric(attempt: &PublishAttempt) {
    let result = match &attempt.result {
        AttemptResult::Published { .. } => "success",
        AttemptResult::Failed { kind, .. } => kind.as_str(),
    };
    counter!(
        METRIC_PUBLISH_ATTEMPT,
        "platform" => attempt.platform.as_str(),
        "result" => result
    )
    .increment(1);
}
