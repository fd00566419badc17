//! Cron tick polling due scheduled posts.

use apalis::prelude::Data;
use time::OffsetDateTime;
use tracing::warn;

use super::context::{SchedulerJobContext, job_failed};

#[derive(Default, Debug, Clone)]
pub struct SchedulerTick;

impl From<chrono::DateTime<chrono::Utc>> for SchedulerTick {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

pub async fn process_scheduler_tick(
    _job: SchedulerTick,
    ctx: Data<SchedulerJobContext>,
) -> Result<(), apalis::prelude::Error> {
    ctx.scheduler
        .run_due(OffsetDateTime::now_utc())
        .await
        .map(|_| ())
        .map_err(|err| {
            warn!(
                target = "peoples_thread::application::jobs::scheduler",
                error = %err,
                "scheduled post poll failed"
            );
            job_failed(err)
        })
}
