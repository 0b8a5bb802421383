//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{BlogRecord, PublishLogRecord};
use crate::domain::types::{BlogStatus, Platform};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateBlogParams {
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
    pub scheduled_at: Option<OffsetDateTime>,
}

/// A publish attempt ready to be appended to the log.
#[derive(Debug, Clone)]
pub struct NewPublishLog {
    pub blog_id: Uuid,
    pub platform: Platform,
    pub platform_post_id: Option<String>,
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait BlogsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BlogRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogRecord>, RepoError>;

    /// Blog whose platform map or aggregate list references `post_id`.
    async fn find_by_remote_post_id(&self, post_id: &str)
    -> Result<Option<BlogRecord>, RepoError>;

    /// Active blogs with `scheduled_at <= now`, oldest first.
    async fn list_due_scheduled(&self, now: OffsetDateTime)
    -> Result<Vec<BlogRecord>, RepoError>;
}

#[async_trait]
pub trait BlogsWriteRepo: Send + Sync {
    async fn create_blog(&self, params: CreateBlogParams) -> Result<BlogRecord, RepoError>;

    /// Persist every mutable column of `blog` and return the stored row.
    async fn save_blog(&self, blog: &BlogRecord) -> Result<BlogRecord, RepoError>;

    /// Open a transaction for a locked read-modify-write of one blog.
    async fn begin_unit(&self) -> Result<Box<dyn BlogUnitOfWork>, RepoError>;
}

/// Transactional scope holding a row lock on the blog it loaded.
///
/// Dropping the unit without calling [`BlogUnitOfWork::commit`] discards the
/// pending writes.
#[async_trait]
pub trait BlogUnitOfWork: Send {
    async fn lock_by_remote_post_id(
        &mut self,
        post_id: &str,
    ) -> Result<Option<BlogRecord>, RepoError>;

    async fn save_blog(&mut self, blog: &BlogRecord) -> Result<(), RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PublishLogRepo: Send + Sync {
    async fn append_attempt(&self, entry: NewPublishLog) -> Result<PublishLogRecord, RepoError>;

    async fn list_for_blog(&self, blog_id: Uuid) -> Result<Vec<PublishLogRecord>, RepoError>;
}
