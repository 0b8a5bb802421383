use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{BlogsRepo, BlogsWriteRepo, CreateBlogParams};
use crate::application::social::{PublishDecision, PublishOrchestrator};
use crate::domain::entities::BlogRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug};
use crate::domain::types::BlogStatus;

use super::types::{
    BlogChange, BlogError, CreateBlogCommand, MAX_BODY_CHARS, MAX_SHORT_DESCRIPTION_CHARS,
    MAX_TITLE_CHARS, MAX_TYPE_CHARS, SweepReport, UpdateBlogCommand, dedup_platforms,
    ensure_absolute_url, ensure_document_reference, ensure_text, optional_text,
};

#[derive(Clone)]
pub struct BlogService {
    reader: Arc<dyn BlogsRepo>,
    writer: Arc<dyn BlogsWriteRepo>,
    orchestrator: Arc<PublishOrchestrator>,
}

impl BlogService {
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

    pub async fn find(&self, id: Uuid) -> Result<BlogRecord, BlogError> {
        self.reader.find_by_id(id).await?.ok_or(BlogError::NotFound)
    }

    /// Store a new blog. A blog created as `published` is inserted as
    /// `active` and promoted only when at least one platform accepts it.
    pub async fn create(&self, command: CreateBlogCommand) -> Result<BlogChange, BlogError> {
        ensure_text(&command.title, "title", MAX_TITLE_CHARS, true)?;
        ensure_text(&command.article_type, "article_type", MAX_TYPE_CHARS, true)?;
        ensure_text(
            &command.short_description,
            "short_description",
            MAX_SHORT_DESCRIPTION_CHARS,
            true,
        )?;
        ensure_text(&command.body, "body", MAX_BODY_CHARS, true)?;

        if command.status == BlogStatus::Deactivated {
            return Err(BlogError::validation(
                "status",
                "blogs cannot be created as deactivated",
            ));
        }

        let image_url = optional_text(command.image_url);
        let video_url = optional_text(command.video_url);
        let document_url = optional_text(command.document_url);
        check_urls(
            image_url.as_deref(),
            video_url.as_deref(),
            document_url.as_deref(),
        )?;

        let slug = self.unique_slug(&command.title, None).await?;
        let publish_now = command.status == BlogStatus::Published;
        let stored_status = if publish_now {
            BlogStatus::Active
        } else {
            command.status
        };

        let blog = self
            .writer
            .create_blog(CreateBlogParams {
                slug,
                title: command.title.trim().to_string(),
                article_type: command.article_type.trim().to_string(),
                short_description: command.short_description.trim().to_string(),
                body: command.body,
                image_url,
                video_url,
                document_url,
                status: stored_status,
                platforms: dedup_platforms(&command.platforms),
                scheduled_at: command.scheduled_at,
            })
            .await?;

        info!(
            target = "blogcast::blogs",
            blog_id = %blog.id,
            slug = %blog.slug,
            status = blog.status.as_str(),
            "Created blog"
        );

        if !publish_now {
            return Ok(BlogChange {
                blog,
                publish: None,
            });
        }

        self.promote(blog, OffsetDateTime::now_utc()).await
    }

    /// Apply a partial update, enforcing the status machine. Moving into
    /// `published` publishes the updated content first and persists nothing
    /// when every platform fails.
    pub async fn update(&self, command: UpdateBlogCommand) -> Result<BlogChange, BlogError> {
        let current = self.find(command.id).await?;
        let mut next = current.clone();

        if let Some(title) = command.title {
            ensure_text(&title, "title", MAX_TITLE_CHARS, true)?;
            let title = title.trim().to_string();
            if title != current.title {
                next.slug = self.unique_slug(&title, Some(current.id)).await?;
                next.title = title;
            }
        }
        if let Some(article_type) = command.article_type {
            ensure_text(&article_type, "article_type", MAX_TYPE_CHARS, true)?;
            next.article_type = article_type.trim().to_string();
        }
        if let Some(short_description) = command.short_description {
            ensure_text(
                &short_description,
                "short_description",
                MAX_SHORT_DESCRIPTION_CHARS,
                true,
            )?;
            next.short_description = short_description.trim().to_string();
        }
        if let Some(body) = command.body {
            ensure_text(&body, "body", MAX_BODY_CHARS, true)?;
            next.body = body;
        }
        if let Some(image_url) = command.image_url {
            next.image_url = optional_text(Some(image_url));
        }
        if let Some(video_url) = command.video_url {
            next.video_url = optional_text(Some(video_url));
        }
        if let Some(document_url) = command.document_url {
            next.document_url = optional_text(Some(document_url));
        }
        check_urls(
            next.image_url.as_deref(),
            next.video_url.as_deref(),
            next.document_url.as_deref(),
        )?;
        if let Some(platforms) = command.platforms {
            next.platforms = dedup_platforms(&platforms);
        }
        if let Some(scheduled_at) = command.scheduled_at {
            next.scheduled_at = Some(scheduled_at);
        }

        let target = command.status.unwrap_or(current.status);
        if !current.status.can_transition_to(target) {
            return Err(BlogError::InvalidTransition {
                from: current.status,
                to: target,
                allowed: DomainError::allowed_from(current.status),
            });
        }

        let now = OffsetDateTime::now_utc();
        if target == BlogStatus::Published && current.status != BlogStatus::Published {
            return self.promote(next, now).await;
        }

        next.status = target;
        next.updated_at = now;
        let blog = self.writer.save_blog(&next).await?;
        Ok(BlogChange {
            blog,
            publish: None,
        })
    }

    /// Publish the platforms of a published blog that have no recorded post.
    pub async fn retry_social(&self, id: Uuid) -> Result<BlogChange, BlogError> {
        let blog = self.find(id).await?;
        match self
            .orchestrator
            .retry(&blog, OffsetDateTime::now_utc())
            .await?
        {
            PublishDecision::Commit { blog, outcome } => {
                let blog = self.writer.save_blog(&blog).await?;
                Ok(BlogChange {
                    blog,
                    publish: Some(outcome),
                })
            }
            PublishDecision::Reject { outcome } => Err(BlogError::PublishRejected { outcome }),
        }
    }

    /// Publish every active blog whose schedule is due, one at a time.
    ///
    /// A blog that fails on every platform keeps its schedule and is picked up
    /// again by the next sweep.
    pub async fn publish_due_blogs(&self, now: OffsetDateTime) -> Result<SweepReport, BlogError> {
        let due = self.reader.list_due_scheduled(now).await?;
        let mut report = SweepReport {
            due: due.len(),
            ..SweepReport::default()
        };

        for blog in due {
            let id = blog.id;
            match self.orchestrator.first_publish(&blog, now).await {
                Ok(PublishDecision::Commit { mut blog, .. }) => {
                    blog.scheduled_at = None;
                    match self.writer.save_blog(&blog).await {
                        Ok(_) => report.published.push(id),
                        Err(err) => {
                            warn!(
                                target = "blogcast::blogs::schedule",
                                blog_id = %id,
                                error = %err,
                                "Failed to persist scheduled publish"
                            );
                            report.errored.push(id);
                        }
                    }
                }
                Ok(PublishDecision::Reject { outcome }) => {
                    warn!(
                        target = "blogcast::blogs::schedule",
                        blog_id = %id,
                        failed = ?outcome.failed_platforms(),
                        "Scheduled publish failed on every platform"
                    );
                    report.rejected.push(id);
                }
                Err(err) => {
                    warn!(
                        target = "blogcast::blogs::schedule",
                        blog_id = %id,
                        error = %err,
                        "Scheduled publish could not run"
                    );
                    report.errored.push(id);
                }
            }
        }

        info!(
            target = "blogcast::blogs::schedule",
            due = report.due,
            published = report.published.len(),
            rejected = report.rejected.len(),
            errored = report.errored.len(),
            "Scheduled publish sweep finished"
        );

        Ok(report)
    }

    async fn promote(&self, blog: BlogRecord, now: OffsetDateTime) -> Result<BlogChange, BlogError> {
        match self.orchestrator.first_publish(&blog, now).await? {
            PublishDecision::Commit { blog, outcome } => {
                let blog = self.writer.save_blog(&blog).await?;
                Ok(BlogChange {
                    blog,
                    publish: Some(outcome),
                })
            }
            PublishDecision::Reject { outcome } => {
                warn!(
                    target = "blogcast::blogs",
                    blog_id = %blog.id,
                    failed = ?outcome.failed_platforms(),
                    "Publish rejected; blog stays unpublished"
                );
                Err(BlogError::PublishRejected { outcome })
            }
        }
    }

    async fn unique_slug(&self, title: &str, owner: Option<Uuid>) -> Result<String, BlogError> {
        let reader = self.reader.clone();
        let result = generate_unique_slug(title, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none_or(|blog| Some(blog.id) == owner))
            }
        })
        .await;

        match result {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Slug(SlugError::EmptyInput | SlugError::Unrepresentable { .. })) => {
                Err(BlogError::validation("title", "cannot be turned into a slug"))
            }
            Err(SlugAsyncError::Slug(SlugError::Exhausted { base })) => Err(BlogError::validation(
                "title",
                format!("no free slug derived from `{base}`"),
            )),
            Err(SlugAsyncError::Predicate(err)) => Err(BlogError::Repo(err)),
        }
    }
}

fn check_urls(
    image_url: Option<&str>,
    video_url: Option<&str>,
    document_url: Option<&str>,
) -> Result<(), BlogError> {
    if let Some(url) = image_url {
        ensure_absolute_url(url, "image_url")?;
    }
    if let Some(url) = video_url {
        ensure_absolute_url(url, "video_url")?;
    }
    if let Some(reference) = document_url {
        ensure_document_reference(reference)?;
    }
    Ok(())
}

