mod support;

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use time::macros::datetime;

use blogcast::application::blogs::{BlogError, CreateBlogCommand, UpdateBlogCommand};
use blogcast::application::social::{AttemptResult, FailureKind, PublishError};
use blogcast::domain::types::{BlogStatus, Platform};

use support::{FakePublisher, harness, harness_with_timeout, published_blog, sample_blog};

fn create_command(status: BlogStatus, platforms: &[Platform]) -> CreateBlogCommand {
    CreateBlogCommand {
        title: "Launch Day".to_string(),
        article_type: "news".to_string(),
        short_description: "We shipped the new release".to_string(),
        body: "<p>The full story.</p>".to_string(),
        image_url: None,
        video_url: Some("https://videos.example.com/launch".to_string()),
        document_url: Some("/storage/documents/launch.pdf".to_string()),
        status,
        platforms: platforms.to_vec(),
        scheduled_at: None,
    }
}

#[tokio::test]
async fn creating_inactive_blog_does_not_publish() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-1"));
    let h = harness(vec![facebook.clone()]);

    let change = h
        .blog_service
        .create(create_command(BlogStatus::Inactive, &[Platform::Facebook]))
        .await
        .expect("create");

    assert_eq!(change.blog.status, BlogStatus::Inactive);
    assert_eq!(change.blog.slug, "launch-day");
    assert!(change.publish.is_none());
    assert_eq!(facebook.publish_count(), 0);
    assert!(h.logs.entries().await.is_empty());
}

#[tokio::test]
async fn duplicate_titles_get_suffixed_slugs() {
    let h = harness(vec![]);

    let first = h
        .blog_service
        .create(create_command(BlogStatus::Inactive, &[]))
        .await
        .expect("first");
    let second = h
        .blog_service
        .create(create_command(BlogStatus::Inactive, &[]))
        .await
        .expect("second");

    assert_eq!(first.blog.slug, "launch-day");
    assert_eq!(second.blog.slug, "launch-day-1");
}

#[tokio::test]
async fn partial_success_publishes_and_records_every_attempt() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-1"));
    let linkedin = Arc::new(FakePublisher::failing(Platform::Linkedin, "token expired"));
    let h = harness(vec![facebook.clone(), linkedin.clone()]);

    let change = h
        .blog_service
        .create(create_command(
            BlogStatus::Published,
            &[Platform::Facebook, Platform::Linkedin],
        ))
        .await
        .expect("create and publish");

    let blog = change.blog;
    assert_eq!(blog.status, BlogStatus::Published);
    assert!(blog.published_at.is_some());
    assert!(blog.social_media_published);
    assert_eq!(
        blog.platform_post_ids.get(&Platform::Facebook).map(String::as_str),
        Some("fb-1")
    );
    assert!(!blog.platform_post_ids.contains_key(&Platform::Linkedin));
    assert_eq!(blog.remote_post_ids, vec!["fb-1".to_string()]);

    let outcome = change.publish.expect("outcome");
    assert!(outcome.is_partial());
    assert_eq!(outcome.failed_platforms(), vec![Platform::Linkedin]);

    let logs = h.logs.entries().await;
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().any(|entry| entry.platform == Platform::Facebook
        && entry.success
        && entry.platform_post_id.as_deref() == Some("fb-1")));
    assert!(logs.iter().any(|entry| entry.platform == Platform::Linkedin
        && !entry.success
        && entry.error.as_deref().is_some_and(|err| err.contains("token expired"))));

    let stored = h.blogs.get(blog.id).await.expect("stored");
    assert_eq!(stored.status, BlogStatus::Published);
}

#[tokio::test]
async fn publish_payload_carries_article_and_document_links() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-1"));
    let h = harness(vec![facebook.clone()]);

    h.blog_service
        .create(create_command(BlogStatus::Published, &[Platform::Facebook]))
        .await
        .expect("publish");

    let published = facebook.published.lock().expect("lock").clone();
    assert_eq!(published.len(), 1);
    let content = &published[0];
    assert_eq!(
        content.link.as_deref(),
        Some("https://blog.example.com/blog/launch-day")
    );
    assert!(content.message.starts_with("Launch Day"));
    assert!(
        content
            .message
            .contains("Download document: https://blog.example.com/storage/documents/launch.pdf")
    );
    assert!(content.message.contains("Watch video: https://videos.example.com/launch"));
    assert!(content.message.chars().count() <= 500);

    let tokens = facebook.tokens.lock().expect("lock").clone();
    assert_eq!(tokens, vec!["facebook-token".to_string()]);
}

#[tokio::test]
async fn total_failure_keeps_blog_unpublished() {
    let facebook = Arc::new(FakePublisher::failing(Platform::Facebook, "page gone"));
    let linkedin = Arc::new(FakePublisher::failing(Platform::Linkedin, "rate limited"));
    let h = harness(vec![facebook, linkedin]);

    let err = h
        .blog_service
        .create(create_command(
            BlogStatus::Published,
            &[Platform::Facebook, Platform::Linkedin],
        ))
        .await
        .expect_err("every platform failed");

    match err {
        BlogError::PublishRejected { outcome } => {
            assert!(outcome.all_failed());
            assert_eq!(outcome.attempts.len(), 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let stored = h.blogs.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, BlogStatus::Active);
    assert!(stored[0].published_at.is_none());
    assert!(stored[0].platform_post_ids.is_empty());
    assert_eq!(h.logs.entries().await.len(), 2);
}

#[tokio::test]
async fn publishing_without_platforms_just_transitions() {
    let h = harness(vec![]);

    let change = h
        .blog_service
        .create(create_command(BlogStatus::Published, &[]))
        .await
        .expect("publish");

    assert_eq!(change.blog.status, BlogStatus::Published);
    assert!(!change.blog.social_media_published);
    assert!(h.logs.entries().await.is_empty());
}

#[tokio::test]
async fn platform_without_publisher_is_reported_as_unsupported() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-1"));
    let h = harness(vec![facebook]);

    let change = h
        .blog_service
        .create(create_command(
            BlogStatus::Published,
            &[Platform::Facebook, Platform::Instagram],
        ))
        .await
        .expect("partial publish");

    let outcome = change.publish.expect("outcome");
    let instagram = outcome
        .attempts
        .iter()
        .find(|attempt| attempt.platform == Platform::Instagram)
        .expect("instagram attempt");
    assert!(matches!(
        instagram.result,
        AttemptResult::Failed {
            kind: FailureKind::Unsupported,
            ..
        }
    ));
}

#[tokio::test]
async fn slow_platform_times_out_without_blocking_others() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-1"));
    let linkedin = Arc::new(
        FakePublisher::succeeding(Platform::Linkedin, "li-1").with_delay(Duration::from_secs(30)),
    );
    let h = harness_with_timeout(vec![facebook, linkedin], Duration::from_millis(50));

    let change = h
        .blog_service
        .create(create_command(
            BlogStatus::Published,
            &[Platform::Facebook, Platform::Linkedin],
        ))
        .await
        .expect("facebook succeeds");

    let outcome = change.publish.expect("outcome");
    let linkedin_attempt = outcome
        .attempts
        .iter()
        .find(|attempt| attempt.platform == Platform::Linkedin)
        .expect("linkedin attempt");
    assert!(matches!(
        linkedin_attempt.result,
        AttemptResult::Failed {
            kind: FailureKind::Timeout,
            ..
        }
    ));
    assert_eq!(change.blog.status, BlogStatus::Published);
}

#[tokio::test]
async fn status_cannot_skip_active() {
    let h = harness(vec![]);
    let blog = h
        .blogs
        .insert(sample_blog(BlogStatus::Inactive, &[]))
        .await;

    let err = h
        .blog_service
        .update(UpdateBlogCommand {
            id: blog.id,
            status: Some(BlogStatus::Published),
            ..UpdateBlogCommand::default()
        })
        .await
        .expect_err("inactive cannot publish directly");

    match err {
        BlogError::InvalidTransition { from, to, allowed } => {
            assert_eq!(from, BlogStatus::Inactive);
            assert_eq!(to, BlogStatus::Published);
            assert!(allowed.contains("active"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn update_to_published_publishes_new_content() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-9"));
    let h = harness(vec![facebook.clone()]);
    let blog = h
        .blogs
        .insert(sample_blog(BlogStatus::Active, &[Platform::Facebook]))
        .await;

    let change = h
        .blog_service
        .update(UpdateBlogCommand {
            id: blog.id,
            title: Some("Launch Week".to_string()),
            status: Some(BlogStatus::Published),
            ..UpdateBlogCommand::default()
        })
        .await
        .expect("update");

    assert_eq!(change.blog.status, BlogStatus::Published);
    assert_eq!(change.blog.title, "Launch Week");
    assert_eq!(change.blog.slug, "launch-week");
    let published = facebook.published.lock().expect("lock").clone();
    assert!(published[0].message.starts_with("Launch Week"));
}

#[tokio::test]
async fn failed_update_to_published_persists_nothing() {
    let facebook = Arc::new(FakePublisher::failing(Platform::Facebook, "nope"));
    let h = harness(vec![facebook]);
    let blog = h
        .blogs
        .insert(sample_blog(BlogStatus::Active, &[Platform::Facebook]))
        .await;

    let err = h
        .blog_service
        .update(UpdateBlogCommand {
            id: blog.id,
            title: Some("Renamed".to_string()),
            status: Some(BlogStatus::Published),
            ..UpdateBlogCommand::default()
        })
        .await
        .expect_err("publish rejected");
    assert!(matches!(err, BlogError::PublishRejected { .. }));

    let stored = h.blogs.get(blog.id).await.expect("stored");
    assert_eq!(stored, blog);
}

#[tokio::test]
async fn update_rejects_invalid_urls() {
    let h = harness(vec![]);
    let blog = h
        .blogs
        .insert(sample_blog(BlogStatus::Active, &[]))
        .await;

    let err = h
        .blog_service
        .update(UpdateBlogCommand {
            id: blog.id,
            image_url: Some("not a url".to_string()),
            ..UpdateBlogCommand::default()
        })
        .await
        .expect_err("invalid url");
    assert!(matches!(
        err,
        BlogError::Validation {
            field: "image_url",
            ..
        }
    ));
}

#[tokio::test]
async fn retry_only_attempts_pending_platforms() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-2"));
    let linkedin = Arc::new(FakePublisher::succeeding(Platform::Linkedin, "li-1"));
    let h = harness(vec![facebook.clone(), linkedin.clone()]);
    let blog = h
        .blogs
        .insert(published_blog(
            &[(Platform::Facebook, "fb-1")],
            &[Platform::Facebook, Platform::Linkedin],
        ))
        .await;

    let change = h
        .blog_service
        .retry_social(blog.id)
        .await
        .expect("retry");

    assert_eq!(facebook.publish_count(), 0);
    assert_eq!(linkedin.publish_count(), 1);
    assert_eq!(
        change.blog.platform_post_ids.get(&Platform::Facebook).map(String::as_str),
        Some("fb-1")
    );
    assert_eq!(
        change.blog.platform_post_ids.get(&Platform::Linkedin).map(String::as_str),
        Some("li-1")
    );
    assert_eq!(change.blog.published_at, blog.published_at);
}

#[tokio::test]
async fn retry_with_nothing_pending_is_rejected() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-2"));
    let h = harness(vec![facebook.clone()]);
    let blog = h
        .blogs
        .insert(published_blog(
            &[(Platform::Facebook, "fb-1")],
            &[Platform::Facebook],
        ))
        .await;

    let err = h
        .blog_service
        .retry_social(blog.id)
        .await
        .expect_err("nothing to retry");

    assert!(matches!(
        err,
        BlogError::Publish(PublishError::NothingToRetry)
    ));
    assert_eq!(facebook.publish_count(), 0);
}

#[tokio::test]
async fn retry_requires_published_blog() {
    let h = harness(vec![]);
    let blog = h
        .blogs
        .insert(sample_blog(BlogStatus::Active, &[Platform::Facebook]))
        .await;

    let err = h
        .blog_service
        .retry_social(blog.id)
        .await
        .expect_err("not published");
    assert!(matches!(
        err,
        BlogError::Publish(PublishError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn scheduled_sweep_publishes_only_due_active_blogs() {
    let facebook = Arc::new(FakePublisher::succeeding(Platform::Facebook, "fb-1"));
    let h = harness(vec![facebook.clone()]);
    let now = datetime!(2026-04-01 12:00 UTC);

    let mut due = sample_blog(BlogStatus::Active, &[Platform::Facebook]);
    due.scheduled_at = Some(datetime!(2026-04-01 11:59 UTC));
    let due = h.blogs.insert(due).await;

    let mut future = sample_blog(BlogStatus::Active, &[Platform::Facebook]);
    future.scheduled_at = Some(datetime!(2026-04-02 00:00 UTC));
    let future = h.blogs.insert(future).await;

    let mut inactive = sample_blog(BlogStatus::Inactive, &[Platform::Facebook]);
    inactive.scheduled_at = Some(datetime!(2026-03-01 00:00 UTC));
    let inactive = h.blogs.insert(inactive).await;

    let report = h
        .blog_service
        .publish_due_blogs(now)
        .await
        .expect("sweep");

    assert_eq!(report.due, 1);
    assert_eq!(report.published, vec![due.id]);
    assert!(report.rejected.is_empty());
    assert_eq!(facebook.publish_count(), 1);

    let stored = h.blogs.get(due.id).await.expect("due");
    assert_eq!(stored.status, BlogStatus::Published);
    assert!(stored.scheduled_at.is_none());

    assert_eq!(
        h.blogs.get(future.id).await.expect("future").status,
        BlogStatus::Active
    );
    assert_eq!(
        h.blogs.get(inactive.id).await.expect("inactive").status,
        BlogStatus::Inactive
    );
}

#[tokio::test]
async fn rejected_scheduled_blog_keeps_its_schedule() {
    let facebook = Arc::new(FakePublisher::failing(Platform::Facebook, "down"));
    let h = harness(vec![facebook]);

    let mut due = sample_blog(BlogStatus::Active, &[Platform::Facebook]);
    due.scheduled_at = Some(datetime!(2026-04-01 11:00 UTC));
    let due = h.blogs.insert(due).await;

    let report = h
        .blog_service
        .publish_due_blogs(OffsetDateTime::now_utc())
        .await
        .expect("sweep");

    assert_eq!(report.rejected, vec![due.id]);
    let stored = h.blogs.get(due.id).await.expect("stored");
    assert_eq!(stored.status, BlogStatus::Active);
    assert_eq!(stored.scheduled_at, due.scheduled_at);
}
