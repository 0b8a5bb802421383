//! Cron job that publishes blogs whose schedule has come due.

use apalis::prelude::*;
use time::OffsetDateTime;

use super::context::{ScheduledPublishContext, job_failed};

/// Tick emitted by the cron stream.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct ScheduledPublishJob;

impl From<chrono::DateTime<chrono::Utc>> for ScheduledPublishJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

/// Run one sweep. Per-blog failures are logged by the sweep itself; only a
/// failure to list due blogs fails the job.
pub async fn process_scheduled_publish_job(
    _job: ScheduledPublishJob,
    ctx: Data<ScheduledPublishContext>,
) -> Result<(), apalis::prelude::Error> {
    let report = ctx
        .blogs
        .publish_due_blogs(OffsetDateTime::now_utc())
        .await
        .map_err(|err| {
            tracing::warn!(
                target = "blogcast::jobs::scheduled_publish",
                error = %err,
                "Scheduled publish sweep failed"
            );
            job_failed(err)
        })?;

    if report.due > 0 {
        tracing::info!(
            target = "blogcast::jobs::scheduled_publish",
            due = report.due,
            published = report.published.len(),
            "Processed scheduled blogs"
        );
    }
    Ok(())
}
