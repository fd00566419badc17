use std::sync::Arc;

use apalis::prelude::Error as ApalisError;

use crate::application::{monitor::MonitorService, scheduler::SchedulerService};

/// Data handed to the PBS monitor cron worker.
#[derive(Clone)]
pub struct MonitorJobContext {
    pub monitor: Arc<MonitorService>,
}

/// Data handed to the scheduled-post cron worker.
#[derive(Clone)]
pub struct SchedulerJobContext {
    pub scheduler: Arc<SchedulerService>,
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convert any error into an [`ApalisError::Failed`].
pub fn job_failed<E>(err: E) -> ApalisError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let boxed: BoxError = Box::new(err);
    ApalisError::Failed(Arc::new(boxed))
}
