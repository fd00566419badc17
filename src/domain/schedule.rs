//! Calendar arithmetic for recurring scheduled posts.

use time::{Duration, Month, OffsetDateTime};

use super::{error::DomainError, types::Recurrence};

/// Advance `from` by one recurrence step.
///
/// Monthly steps land on `anchor_day`, clamped to the last day of shorter
/// months (Jan 31 → Feb 28/29 → Mar 31).
pub fn advance(
    recurrence: Recurrence,
    from: OffsetDateTime,
    anchor_day: u8,
) -> Result<Option<OffsetDateTime>, DomainError> {
    let next = match recurrence {
        Recurrence::None => return Ok(None),
        Recurrence::Daily => from.checked_add(Duration::days(1)),
        Recurrence::Weekly => from.checked_add(Duration::weeks(1)),
        Recurrence::Monthly => add_one_month(from, anchor_day),
    };

    next.map(Some)
        .ok_or_else(|| DomainError::invariant("recurrence overflowed the supported date range"))
}

/// First occurrence strictly after `now`, stepping from `from`.
///
/// A post that ran late (server down for a week) does not queue one follow-up
/// per missed day; it jumps straight to the next future slot.
pub fn next_occurrence(
    recurrence: Recurrence,
    from: OffsetDateTime,
    anchor_day: u8,
    now: OffsetDateTime,
) -> Result<Option<OffsetDateTime>, DomainError> {
    let mut current = from;
    loop {
        match advance(recurrence, current, anchor_day)? {
            None => return Ok(None),
            Some(next) if next > now => return Ok(Some(next)),
            Some(next) => current = next,
        }
    }
}

fn add_one_month(from: OffsetDateTime, anchor_day: u8) -> Option<OffsetDateTime> {
    let date = from.date();
    let (year, month) = match date.month() {
        Month::December => (date.year().checked_add(1)?, Month::January),
        other => (date.year(), other.next()),
    };
    let next_date = (28..=anchor_day)
        .rev()
        .find_map(|day| time::Date::from_calendar_date(year, month, day).ok())
        .or_else(|| time::Date::from_calendar_date(year, month, anchor_day).ok())?;
    Some(from.replace_date(next_date))
}
