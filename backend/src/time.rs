//! Local-time helpers
//!
//! Day boundaries are computed in the configured business timezone and
//! handed to queries as UTC instants. Range ends are exclusive (next local
//! midnight), which covers the whole last day.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use shared::types::DateRange;

use crate::error::{AppError, AppResult};

/// Parse a `YYYY-MM-DD` date, also accepting a full RFC 3339 timestamp
pub fn parse_date(field: &str, value: &str) -> AppResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| AppError::field(field, format!("Invalid date: {}", value)))
}

/// Parse an optional query date, treating blank as absent
pub fn parse_optional_date(field: &str, value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date(field, v).map(Some),
        None => Ok(None),
    }
}

/// Current calendar date in the business timezone
pub fn local_today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Local date + time as a UTC instant
///
/// A local time skipped by a DST jump falls back to reading it as UTC.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    naive
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// Local midnight starting `date`
pub fn day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_to_utc(date, NaiveTime::MIN, tz)
}

/// Local midnight after `date`, used as an exclusive end
pub fn day_end_exclusive(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let next = date.succ_opt().unwrap_or(date);
    day_start(next, tz)
}

/// UTC bounds `[start, end)` of a date range; each side optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UtcBounds {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl UtcBounds {
    pub fn from_range(range: DateRange, tz: Tz) -> Self {
        Self {
            start: range.start.map(|d| day_start(d, tz)),
            end: range.end.map(|d| day_end_exclusive(d, tz)),
        }
    }

    pub fn day(date: NaiveDate, tz: Tz) -> Self {
        Self::from_range(DateRange::day(date), tz)
    }
}
