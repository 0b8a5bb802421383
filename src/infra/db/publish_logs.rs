use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NewPublishLog, PublishLogRepo, RepoError};
use crate::domain::entities::PublishLogRecord;
use crate::domain::types::Platform;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct PublishLogRow {
    id: Uuid,
    blog_id: Uuid,
    platform: Platform,
    platform_post_id: Option<String>,
    success: bool,
    response: Option<String>,
    error: Option<String>,
    created_at: OffsetDateTime,
}

impl From<PublishLogRow> for PublishLogRecord {
    fn from(row: PublishLogRow) -> Self {
        Self {
            id: row.id,
            blog_id: row.blog_id,
            platform: row.platform,
            platform_post_id: row.platform_post_id,
            success: row.success,
            response: row.response,
            error: row.error,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PublishLogRepo for PostgresRepositories {
    async fn append_attempt(&self, entry: NewPublishLog) -> Result<PublishLogRecord, RepoError> {
        let row = sqlx::query_as::<_, PublishLogRow>(
            r#"
            INSERT INTO social_media_logs (
                id, blog_id, platform, platform_post_id, success, response, error, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, blog_id, platform, platform_post_id, success, response, error, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.blog_id)
        .bind(entry.platform)
        .bind(entry.platform_post_id)
        .bind(entry.success)
        .bind(entry.response)
        .bind(entry.error)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PublishLogRecord::from(row))
    }

    async fn list_for_blog(&self, blog_id: Uuid) -> Result<Vec<PublishLogRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PublishLogRow>(
            r#"
            SELECT id, blog_id, platform, platform_post_id, success, response, error, created_at
            FROM social_media_logs
            WHERE blog_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(blog_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PublishLogRecord::from).collect())
    }
}
