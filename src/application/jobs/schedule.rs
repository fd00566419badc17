use std::str::FromStr;

use apalis_cron::Schedule;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid cron expression `{expression}` for `{key}`: {reason}")]
pub struct ScheduleError {
    pub key: &'static str,
    pub expression: String,
    pub reason: String,
}

/// Parse a six-field (seconds precision) cron expression from settings.
pub fn parse_schedule(key: &'static str, expression: &str) -> Result<Schedule, ScheduleError> {
    Schedule::from_str(expression.trim()).map_err(|err| ScheduleError {
        key,
        expression: expression.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedules_parse() {
        for expression in ["0 0 * * * *", "0 * * * * *"] {
            let schedule = parse_schedule("test", expression).expect("valid");
            let upcoming: Vec<_> = schedule.upcoming(chrono::Utc).take(3).collect();
            assert_eq!(upcoming.len(), 3);
        }
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_schedule("monitor.schedule", "every hour").expect_err("invalid");
        assert_eq!(err.key, "monitor.schedule");
    }
}
