#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

use blogcast::application::blogs::BlogService;
use blogcast::application::repos::{
    BlogUnitOfWork, BlogsRepo, BlogsWriteRepo, CreateBlogParams, NewPublishLog, PublishLogRepo,
    RepoError,
};
use blogcast::application::social::{
    ContentFormatter, CredentialResolver, PlatformPublisher, PostsPage, PublishContent,
    PublishOrchestrator, PublishReceipt, PublisherError, PublisherRegistry, RemotePost,
    SocialPostService, StaticTokenSource,
};
use blogcast::cache::{AccessToken, TokenCache};
use blogcast::domain::entities::{BlogRecord, PublishLogRecord};
use blogcast::domain::types::{BlogStatus, Platform};

type Store = Arc<Mutex<HashMap<Uuid, BlogRecord>>>;

#[derive(Default)]
pub struct MemoryBlogs {
    blogs: Store,
    pub fail_commit: AtomicBool,
    pub commits: Arc<AtomicUsize>,
    pub rollbacks: Arc<AtomicUsize>,
}

impl MemoryBlogs {
    pub async fn insert(&self, blog: BlogRecord) -> BlogRecord {
        self.blogs.lock().await.insert(blog.id, blog.clone());
        blog
    }

    pub async fn get(&self, id: Uuid) -> Option<BlogRecord> {
        self.blogs.lock().await.get(&id).cloned()
    }

    pub async fn all(&self) -> Vec<BlogRecord> {
        self.blogs.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl BlogsRepo for MemoryBlogs {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BlogRecord>, RepoError> {
        Ok(self.get(id).await)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogRecord>, RepoError> {
        Ok(self
            .blogs
            .lock()
            .await
            .values()
            .find(|blog| blog.slug == slug)
            .cloned())
    }

    async fn find_by_remote_post_id(
        &self,
        post_id: &str,
    ) -> Result<Option<BlogRecord>, RepoError> {
        Ok(self
            .blogs
            .lock()
            .await
            .values()
            .find(|blog| blog.owns_remote_post(post_id))
            .cloned())
    }

    async fn list_due_scheduled(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<BlogRecord>, RepoError> {
        let mut due: Vec<BlogRecord> = self
            .blogs
            .lock()
            .await
            .values()
            .filter(|blog| {
                blog.status == BlogStatus::Active
                    && blog.scheduled_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|blog| blog.scheduled_at);
        Ok(due)
    }
}

#[async_trait]
impl BlogsWriteRepo for MemoryBlogs {
    async fn create_blog(&self, params: CreateBlogParams) -> Result<BlogRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let blog = BlogRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            article_type: params.article_type,
            short_description: params.short_description,
            body: params.body,
            image_url: params.image_url,
            video_url: params.video_url,
            document_url: params.document_url,
            status: params.status,
            platforms: params.platforms,
            scheduled_at: params.scheduled_at,
            published_at: None,
            social_media_published: false,
            platform_post_ids: BTreeMap::new(),
            remote_post_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        Ok(self.insert(blog).await)
    }

    async fn save_blog(&self, blog: &BlogRecord) -> Result<BlogRecord, RepoError> {
        let mut blogs = self.blogs.lock().await;
        if !blogs.contains_key(&blog.id) {
            return Err(RepoError::NotFound);
        }
        blogs.insert(blog.id, blog.clone());
        Ok(blog.clone())
    }

    async fn begin_unit(&self) -> Result<Box<dyn BlogUnitOfWork>, RepoError> {
        Ok(Box::new(MemoryUnit {
            blogs: self.blogs.clone(),
            pending: Vec::new(),
            fail_commit: self.fail_commit.load(Ordering::SeqCst),
            commits: self.commits.clone(),
            rollbacks: self.rollbacks.clone(),
        }))
    }
}

/// Buffers writes until commit, like a transaction would.
struct MemoryUnit {
    blogs: Store,
    pending: Vec<BlogRecord>,
    fail_commit: bool,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

#[async_trait]
impl BlogUnitOfWork for MemoryUnit {
    async fn lock_by_remote_post_id(
        &mut self,
        post_id: &str,
    ) -> Result<Option<BlogRecord>, RepoError> {
        Ok(self
            .blogs
            .lock()
            .await
            .values()
            .find(|blog| blog.owns_remote_post(post_id))
            .cloned())
    }

    async fn save_blog(&mut self, blog: &BlogRecord) -> Result<(), RepoError> {
        self.pending.push(blog.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        if self.fail_commit {
            return Err(RepoError::from_persistence("connection reset during commit"));
        }
        let mut blogs = self.blogs.lock().await;
        for blog in self.pending {
            blogs.insert(blog.id, blog);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPublishLogs {
    entries: Mutex<Vec<PublishLogRecord>>,
}

impl MemoryPublishLogs {
    pub async fn entries(&self) -> Vec<PublishLogRecord> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl PublishLogRepo for MemoryPublishLogs {
    async fn append_attempt(&self, entry: NewPublishLog) -> Result<PublishLogRecord, RepoError> {
        let record = PublishLogRecord {
            id: Uuid::new_v4(),
            blog_id: entry.blog_id,
            platform: entry.platform,
            platform_post_id: entry.platform_post_id,
            success: entry.success,
            response: entry.response,
            error: entry.error,
            created_at: OffsetDateTime::now_utc(),
        };
        self.entries.lock().await.push(record.clone());
        Ok(record)
    }

    async fn list_for_blog(&self, blog_id: Uuid) -> Result<Vec<PublishLogRecord>, RepoError> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|entry| entry.blog_id == blog_id)
            .cloned()
            .collect())
    }
}

/// Publisher with canned results that records what it was asked to do.
pub struct FakePublisher {
    platform: Platform,
    publish: Result<String, PublisherError>,
    delete: Result<(), PublisherError>,
    delay: Option<Duration>,
    pub published: StdMutex<Vec<PublishContent>>,
    pub deleted: StdMutex<Vec<String>>,
    pub tokens: StdMutex<Vec<String>>,
}

impl FakePublisher {
    pub fn succeeding(platform: Platform, post_id: &str) -> Self {
        Self {
            platform,
            publish: Ok(post_id.to_string()),
            delete: Ok(()),
            delay: None,
            published: StdMutex::new(Vec::new()),
            deleted: StdMutex::new(Vec::new()),
            tokens: StdMutex::new(Vec::new()),
        }
    }

    pub fn failing(platform: Platform, message: &str) -> Self {
        Self {
            publish: Err(remote_error(platform, message)),
            ..Self::succeeding(platform, "")
        }
    }

    pub fn with_delete_error(mut self, message: &str) -> Self {
        self.delete = Err(remote_error(self.platform, message));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

pub fn remote_error(platform: Platform, message: &str) -> PublisherError {
    PublisherError::Remote {
        platform,
        status: Some(400),
        code: Some(100),
        message: message.to_string(),
        response: Some(format!(r#"{{"error":{{"message":"{message}"}}}}"#)),
    }
}

#[async_trait]
impl PlatformPublisher for FakePublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn character_limit(&self) -> usize {
        500
    }

    async fn publish(
        &self,
        token: &AccessToken,
        content: &PublishContent,
    ) -> Result<PublishReceipt, PublisherError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.published
            .lock()
            .expect("published lock")
            .push(content.clone());
        self.tokens
            .lock()
            .expect("tokens lock")
            .push(token.expose().to_string());
        self.publish.clone().map(|post_id| PublishReceipt {
            response: format!(r#"{{"id":"{post_id}"}}"#),
            post_id,
        })
    }

    async fn delete(&self, _token: &AccessToken, post_id: &str) -> Result<(), PublisherError> {
        self.deleted
            .lock()
            .expect("deleted lock")
            .push(post_id.to_string());
        self.delete.clone()
    }

    async fn list_posts(
        &self,
        _token: &AccessToken,
        limit: u32,
        _cursor: Option<&str>,
    ) -> Result<PostsPage, PublisherError> {
        let posts = (0..limit.min(3))
            .map(|index| RemotePost {
                id: format!("{}-{index}", self.platform),
                message: Some(format!("post {index}")),
                created_time: None,
                permalink_url: None,
                full_picture: None,
            })
            .collect();
        Ok(PostsPage {
            posts,
            next_cursor: None,
        })
    }
}

pub struct Harness {
    pub blogs: Arc<MemoryBlogs>,
    pub logs: Arc<MemoryPublishLogs>,
    pub cache: Arc<TokenCache>,
    pub blog_service: Arc<BlogService>,
    pub social: Arc<SocialPostService>,
}

pub fn harness(publishers: Vec<Arc<FakePublisher>>) -> Harness {
    harness_with_timeout(publishers, Duration::from_secs(5))
}

pub fn harness_with_timeout(publishers: Vec<Arc<FakePublisher>>, timeout: Duration) -> Harness {
    let blogs = Arc::new(MemoryBlogs::default());
    let logs = Arc::new(MemoryPublishLogs::default());
    let cache = Arc::new(TokenCache::new());

    let mut resolver = CredentialResolver::new(cache.clone(), Duration::from_secs(3600));
    let mut registry = PublisherRegistry::new();
    for publisher in publishers {
        let platform = publisher.platform();
        resolver = resolver.with_source(Arc::new(StaticTokenSource::new(
            platform,
            Some(format!("{platform}-token")),
        )));
        registry = registry.with(publisher);
    }

    let site = Url::parse("https://blog.example.com/").expect("site url");
    let orchestrator = Arc::new(PublishOrchestrator::new(
        Arc::new(resolver),
        registry,
        ContentFormatter::new(Some(site)),
        logs.clone(),
        timeout,
    ));

    let blog_service = Arc::new(BlogService::new(
        blogs.clone(),
        blogs.clone(),
        orchestrator.clone(),
    ));
    let social = Arc::new(SocialPostService::new(
        blogs.clone(),
        blogs.clone(),
        orchestrator,
    ));

    Harness {
        blogs,
        logs,
        cache,
        blog_service,
        social,
    }
}

pub fn sample_blog(status: BlogStatus, platforms: &[Platform]) -> BlogRecord {
    let created = datetime!(2026-03-01 09:00 UTC);
    BlogRecord {
        id: Uuid::new_v4(),
        slug: format!("launch-day-{}", Uuid::new_v4().simple()),
        title: "Launch Day".to_string(),
        article_type: "news".to_string(),
        short_description: "We shipped the new release".to_string(),
        body: "<p>The <strong>full</strong> story.</p>".to_string(),
        image_url: None,
        video_url: None,
        document_url: None,
        status,
        platforms: platforms.to_vec(),
        scheduled_at: None,
        published_at: None,
        social_media_published: false,
        platform_post_ids: BTreeMap::new(),
        remote_post_ids: Vec::new(),
        created_at: created,
        updated_at: created,
    }
}

/// A published blog already carrying remote posts.
pub fn published_blog(posts: &[(Platform, &str)], platforms: &[Platform]) -> BlogRecord {
    let mut blog = sample_blog(BlogStatus::Published, platforms);
    for (platform, post_id) in posts {
        blog.platform_post_ids
            .insert(*platform, (*post_id).to_string());
        blog.remote_post_ids.push((*post_id).to_string());
    }
    blog.social_media_published = !posts.is_empty();
    blog.published_at = Some(datetime!(2026-03-02 09:00 UTC));
    blog
}
