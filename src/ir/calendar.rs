//! Calendar helpers
//!
//! All date arithmetic in HealthQL happens on local wall-clock time and is
//! re-resolved in the local time zone afterwards, so "7 days ago" stays at the
//! same wall-clock time across a DST transition. Hour steps are the exception:
//! they move absolute time.

use crate::ir::GroupBy;
use chrono::{DateTime, Datelike, Days, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// An instant, carried in the local time zone
pub type Timestamp = DateTime<Local>;

/// Source of "now" for date functions, default lookbacks and bucketing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Read the system clock on every call
    #[default]
    System,
    /// Always return the same instant
    Fixed(Timestamp),
}

impl Clock {
    /// The current instant according to this clock
    pub fn now(&self) -> Timestamp {
        match self {
            Self::System => Local::now(),
            Self::Fixed(instant) => *instant,
        }
    }

    /// Midnight at the start of the current local day
    pub fn today(&self) -> Timestamp {
        start_of_day(self.now())
    }
}

/// Resolve a local wall-clock time to an instant.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// DST gap are pushed forward by an hour.
pub fn resolve_local(naive: NaiveDateTime) -> Option<Timestamp> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

fn midnight(date: NaiveDate) -> Option<Timestamp> {
    resolve_local(date.and_time(NaiveTime::MIN))
}

/// Midnight at the start of the instant's local day
pub fn start_of_day(instant: Timestamp) -> Timestamp {
    midnight(instant.date_naive()).unwrap_or(instant)
}

/// Midnight on the Monday of the instant's week
pub fn start_of_week(instant: Timestamp) -> Timestamp {
    let date = instant.date_naive();
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset))
        .and_then(midnight)
        .unwrap_or(instant)
}

/// Midnight on the first day of the instant's month
pub fn start_of_month(instant: Timestamp) -> Timestamp {
    instant
        .date_naive()
        .with_day(1)
        .and_then(midnight)
        .unwrap_or(instant)
}

/// Midnight on January 1st of the instant's year
pub fn start_of_year(instant: Timestamp) -> Timestamp {
    NaiveDate::from_ymd_opt(instant.year(), 1, 1)
        .and_then(midnight)
        .unwrap_or(instant)
}

/// Move an instant by `amount` calendar periods (negative moves backwards).
///
/// Months and years clamp to the last day of shorter months. If the result
/// cannot be represented the input is returned unchanged.
pub fn shift(instant: Timestamp, period: GroupBy, amount: i64) -> Timestamp {
    match period {
        GroupBy::Hour => Duration::try_hours(amount)
            .and_then(|delta| instant.checked_add_signed(delta))
            .unwrap_or(instant),
        GroupBy::Day => shift_days(instant, amount),
        GroupBy::Week => shift_days(instant, amount.saturating_mul(7)),
        GroupBy::Month => shift_months(instant, amount),
        GroupBy::Year => shift_months(instant, amount.saturating_mul(12)),
    }
}

fn shift_days(instant: Timestamp, days: i64) -> Timestamp {
    let naive = instant.naive_local();
    let step = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        naive.checked_add_days(step)
    } else {
        naive.checked_sub_days(step)
    };
    shifted.and_then(resolve_local).unwrap_or(instant)
}

fn shift_months(instant: Timestamp, months: i64) -> Timestamp {
    let Ok(count) = u32::try_from(months.unsigned_abs()) else {
        return instant;
    };
    let naive = instant.naive_local();
    let shifted = if months >= 0 {
        naive.checked_add_months(Months::new(count))
    } else {
        naive.checked_sub_months(Months::new(count))
    };
    shifted.and_then(resolve_local).unwrap_or(instant)
}

/// Parse a local date literal.
///
/// Accepted forms, tried in order: `YYYY-MM-DD HH:mm:ss`, `YYYY-MM-DD HH:mm`,
/// `YYYY-MM-DD` (midnight).
pub fn parse_local_datetime(text: &str) -> Option<Timestamp> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return resolve_local(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M") {
        return resolve_local(naive);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(midnight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap();
        resolve_local(naive).unwrap()
    }

    #[test]
    fn test_start_of_day() {
        let t = local(2026, 2, 5, 16, 42);
        let day = start_of_day(t);
        assert_eq!(day.date_naive(), t.date_naive());
        assert_eq!(day.hour(), 0);
        assert_eq!(day.minute(), 0);
    }

    #[test]
    fn test_start_of_week_is_monday() {
        // 2026-02-05 is a Thursday
        let t = local(2026, 2, 5, 16, 42);
        let week = start_of_week(t);
        assert_eq!(week.date_naive(), NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
        assert_eq!(week.hour(), 0);
    }

    #[test]
    fn test_start_of_month_and_year() {
        let t = local(2026, 2, 5, 16, 42);
        assert_eq!(
            start_of_month(t).date_naive(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
        assert_eq!(
            start_of_year(t).date_naive(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_shift_calendar_units() {
        let t = local(2026, 3, 31, 10, 0);

        assert_eq!(shift(t, GroupBy::Day, -7), local(2026, 3, 24, 10, 0));
        assert_eq!(shift(t, GroupBy::Week, -2), local(2026, 3, 17, 10, 0));
        // February has no 31st: clamps to the last day
        assert_eq!(shift(t, GroupBy::Month, -1), local(2026, 2, 28, 10, 0));
        assert_eq!(shift(t, GroupBy::Year, -1), local(2025, 3, 31, 10, 0));
        assert_eq!(shift(t, GroupBy::Hour, -4), t - Duration::hours(4));
        assert_eq!(shift(t, GroupBy::Day, 1), local(2026, 4, 1, 10, 0));
    }

    #[test]
    fn test_parse_local_datetime_forms() {
        assert_eq!(
            parse_local_datetime("2026-02-05 16:00:30"),
            Some(local(2026, 2, 5, 16, 0) + Duration::seconds(30))
        );
        assert_eq!(
            parse_local_datetime("2026-02-05 16:00"),
            Some(local(2026, 2, 5, 16, 0))
        );
        assert_eq!(
            parse_local_datetime("2026-02-05"),
            Some(local(2026, 2, 5, 0, 0))
        );
        assert_eq!(parse_local_datetime("iPhone"), None);
        assert_eq!(parse_local_datetime("2026-13-01"), None);
    }

    #[test]
    fn test_fixed_clock() {
        let t = local(2026, 2, 5, 16, 42);
        let clock = Clock::Fixed(t);
        assert_eq!(clock.now(), t);
        assert_eq!(clock.today(), local(2026, 2, 5, 0, 0));
    }
}
