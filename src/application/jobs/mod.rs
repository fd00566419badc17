mod context;
mod monitor;
mod schedule;
mod scheduler;

pub use context::{MonitorJobContext, SchedulerJobContext, job_failed};
pub use monitor::{MonitorTick, process_monitor_tick};
pub use schedule::{ScheduleError, parse_schedule};
pub use scheduler::{SchedulerTick, process_scheduler_tick};
