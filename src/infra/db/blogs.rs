use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    BlogUnitOfWork, BlogsRepo, BlogsWriteRepo, CreateBlogParams, RepoError,
};
use crate::domain::entities::BlogRecord;
use crate::domain::types::{BlogStatus, Platform};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

const BLOG_COLUMNS: &str = "id, slug, title, article_type, short_description, body, \
    image_url, video_url, document_url, status, platforms, scheduled_at, published_at, \
    social_media_published, platform_post_ids, remote_post_ids, created_at, updated_at";

/// Matches rows referencing `$1` in either the aggregate list or the platform map.
const REMOTE_POST_PREDICATE: &str = "(remote_post_ids @> jsonb_build_array($1::text) \
    OR EXISTS (SELECT 1 FROM jsonb_each_text(platform_post_ids) AS ids WHERE ids.value = $1))";

#[derive(sqlx::FromRow)]
pub(crate) struct BlogRow {
    id: Uuid,
    slug: String,
    title: String,
    article_type: String,
    short_description: String,
    body: String,
    image_url: Option<String>,
    video_url: Option<String>,
    document_url: Option<String>,
    status: BlogStatus,
    platforms: Json<Vec<Platform>>,
    scheduled_at: Option<OffsetDateTime>,
    published_at: Option<OffsetDateTime>,
    social_media_published: bool,
    platform_post_ids: Json<BTreeMap<Platform, String>>,
    remote_post_ids: Json<Vec<String>>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BlogRow> for BlogRecord {
    fn from(row: BlogRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            article_type: row.article_type,
            short_description: row.short_description,
            body: row.body,
            image_url: row.image_url,
            video_url: row.video_url,
            document_url: row.document_url,
            status: row.status,
            platforms: row.platforms.0,
            scheduled_at: row.scheduled_at,
            published_at: row.published_at,
            social_media_published: row.social_media_published,
            platform_post_ids: row.platform_post_ids.0,
            remote_post_ids: row.remote_post_ids.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn update_blog_sql() -> String {
    format!(
        "UPDATE blogs SET \
            slug = $2, title = $3, article_type = $4, short_description = $5, body = $6, \
            image_url = $7, video_url = $8, document_url = $9, status = $10, platforms = $11, \
            scheduled_at = $12, published_at = $13, social_media_published = $14, \
            platform_post_ids = $15, remote_post_ids = $16, updated_at = $17 \
         WHERE id = $1 \
         RETURNING {BLOG_COLUMNS}"
    )
}

/// Bind every mutable column of `blog` onto [`update_blog_sql`].
fn bind_update<'q>(
    sql: &'q str,
    blog: &'q BlogRecord,
) -> sqlx::query::QueryAs<'q, Postgres, BlogRow, sqlx::postgres::PgArguments> {
    sqlx::query_as::<_, BlogRow>(sql)
        .bind(blog.id)
        .bind(&blog.slug)
        .bind(&blog.title)
        .bind(&blog.article_type)
        .bind(&blog.short_description)
        .bind(&blog.body)
        .bind(&blog.image_url)
        .bind(&blog.video_url)
        .bind(&blog.document_url)
        .bind(blog.status)
        .bind(Json(&blog.platforms))
        .bind(blog.scheduled_at)
        .bind(blog.published_at)
        .bind(!blog.platform_post_ids.is_empty())
        .bind(Json(&blog.platform_post_ids))
        .bind(Json(&blog.remote_post_ids))
        .bind(blog.updated_at)
}

#[async_trait]
impl BlogsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BlogRecord>, RepoError> {
        let sql = format!("SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1");
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(BlogRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogRecord>, RepoError> {
        let sql = format!("SELECT {BLOG_COLUMNS} FROM blogs WHERE slug = $1");
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(BlogRecord::from))
    }

    async fn find_by_remote_post_id(
        &self,
        post_id: &str,
    ) -> Result<Option<BlogRecord>, RepoError> {
        let sql = format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE {REMOTE_POST_PREDICATE} \
             ORDER BY updated_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(post_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(BlogRecord::from))
    }

    async fn list_due_scheduled(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<BlogRecord>, RepoError> {
        let sql = format!(
            "SELECT {BLOG_COLUMNS} FROM blogs \
             WHERE status = $1 AND scheduled_at IS NOT NULL AND scheduled_at <= $2 \
             ORDER BY scheduled_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(BlogStatus::Active)
            .bind(now)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(BlogRecord::from).collect())
    }
}

#[async_trait]
impl BlogsWriteRepo for PostgresRepositories {
    async fn create_blog(&self, params: CreateBlogParams) -> Result<BlogRecord, RepoError> {
        let CreateBlogParams {
            slug,
            title,
            article_type,
            short_description,
            body,
            image_url,
            video_url,
            document_url,
            status,
            platforms,
            scheduled_at,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let sql = format!(
            "INSERT INTO blogs ( \
                id, slug, title, article_type, short_description, body, \
                image_url, video_url, document_url, status, platforms, scheduled_at, \
                created_at, updated_at \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13) \
             RETURNING {BLOG_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(id)
            .bind(slug)
            .bind(title)
            .bind(article_type)
            .bind(short_description)
            .bind(body)
            .bind(image_url)
            .bind(video_url)
            .bind(document_url)
            .bind(status)
            .bind(Json(platforms))
            .bind(scheduled_at)
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(BlogRecord::from(row))
    }

    async fn save_blog(&self, blog: &BlogRecord) -> Result<BlogRecord, RepoError> {
        let sql = update_blog_sql();
        let row = bind_update(&sql, blog)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(BlogRecord::from(row))
    }

    async fn begin_unit(&self) -> Result<Box<dyn BlogUnitOfWork>, RepoError> {
        let tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(PgBlogUnit { tx }))
    }
}

/// Transaction holding `FOR UPDATE` locks on the rows it reads.
pub(crate) struct PgBlogUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BlogUnitOfWork for PgBlogUnit {
    async fn lock_by_remote_post_id(
        &mut self,
        post_id: &str,
    ) -> Result<Option<BlogRecord>, RepoError> {
        let sql = format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE {REMOTE_POST_PREDICATE} \
             ORDER BY updated_at DESC LIMIT 1 FOR UPDATE"
        );
        let row = sqlx::query_as::<_, BlogRow>(&sql)
            .bind(post_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(BlogRecord::from))
    }

    async fn save_blog(&mut self, blog: &BlogRecord) -> Result<(), RepoError> {
        let sql = update_blog_sql();
        bind_update(&sql, blog)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}
