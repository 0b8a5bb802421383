mod context;
mod scheduled_publish;

pub use context::{ScheduledPublishContext, job_failed};
pub use scheduled_publish::{ScheduledPublishJob, process_scheduled_publish_job};
