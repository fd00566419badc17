//! Cron tick running the PBS monitor.

use apalis::prelude::Data;
use tracing::{info, warn};

use crate::application::monitor::{MonitorError, MonitorTrigger};

use super::context::{MonitorJobContext, job_failed};

/// Marker job emitted by the cron stream.
#[derive(Default, Debug, Clone)]
pub struct MonitorTick;

impl From<chrono::DateTime<chrono::Utc>> for MonitorTick {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

pub async fn process_monitor_tick(
    _job: MonitorTick,
    ctx: Data<MonitorJobContext>,
) -> Result<(), apalis::prelude::Error> {
    match ctx.monitor.run(MonitorTrigger::Schedule).await {
        Ok(report) => {
            info!(
                target = "peoples_thread::application::jobs::monitor",
                generated = report.generated.len(),
                failed = report.failures.len(),
                "scheduled monitor run completed"
            );
            Ok(())
        }
        Err(MonitorError::AlreadyRunning) => {
            info!(
                target = "peoples_thread::application::jobs::monitor",
                "monitor still running, skipping tick"
            );
            Ok(())
        }
        Err(err) => {
            warn!(
                target = "peoples_thread::application::jobs::monitor",
                error = %err,
                "scheduled monitor run failed"
            );
            Err(job_failed(err))
        }
    }
}
