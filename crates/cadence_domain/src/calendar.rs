use std::fmt;

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How often a recurring task is expected to happen. `OneOff` tasks never
/// enter the recurrence engine; every computation treats them as inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrenceInterval {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    OneOff,
}

impl RecurrenceInterval {
    pub fn is_recurring(self) -> bool {
        !matches!(self, RecurrenceInterval::OneOff)
    }
}

/// A timezone-free local calendar day. Equality and ordering are defined on
/// the (year, month, day) triple, never on wall-clock instants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CalendarDay(NaiveDate);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DayParseError {
    #[error("empty day string")]
    Empty,
    #[error("`{0}` is not a YYYY-MM-DD day string")]
    Malformed(String),
    #[error("`{0}` is not a real calendar date")]
    OutOfRange(String),
}

impl CalendarDay {
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(CalendarDay)
    }

    /// Parses `YYYY-MM-DD` or `YYYY-MM-DDT...` from the literal digits,
    /// discarding any time/zone suffix. This deliberately never routes
    /// through a UTC-epoch conversion, so the day cannot shift under the
    /// caller's local offset.
    pub fn parse(text: &str) -> Result<Self, DayParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DayParseError::Empty);
        }
        let date_part = trimmed
            .split(['T', ' '])
            .next()
            .unwrap_or(trimmed);

        let mut parts = date_part.splitn(3, '-');
        let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DayParseError::Malformed(text.to_string()));
        };
        if year.len() != 4 || !(1..=2).contains(&month.len()) || !(1..=2).contains(&day.len()) {
            return Err(DayParseError::Malformed(text.to_string()));
        }
        let numeric = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if !numeric(year) || !numeric(month) || !numeric(day) {
            return Err(DayParseError::Malformed(text.to_string()));
        }

        let year: i32 = year
            .parse()
            .map_err(|_| DayParseError::Malformed(text.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| DayParseError::Malformed(text.to_string()))?;
        let day: u32 = day
            .parse()
            .map_err(|_| DayParseError::Malformed(text.to_string()))?;

        CalendarDay::new(year, month, day).ok_or_else(|| DayParseError::OutOfRange(text.to_string()))
    }

    /// The caller's local calendar day right now. Engine functions take
    /// `today` as an explicit parameter; the service layer reads this once
    /// per user-visible action.
    pub fn today() -> Self {
        CalendarDay(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for CalendarDay {
    fn from(date: NaiveDate) -> Self {
        CalendarDay(date)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Formats an optional day, falling back to an empty string so callers can
/// render absent dates without a special case.
pub fn format_opt(day: Option<CalendarDay>) -> String {
    day.map(|d| d.to_string()).unwrap_or_default()
}

/// Adds `count` cycles to `day`. Monthly and quarterly steps move whole
/// calendar months and clamp the day-of-month (Jan 31 + 1 month = Feb 29
/// in a leap year). On arithmetic overflow the original day is returned.
pub fn add_interval(day: CalendarDay, interval: RecurrenceInterval, count: u32) -> CalendarDay {
    let base = day.0;
    let stepped = match interval {
        RecurrenceInterval::Daily => base.checked_add_days(Days::new(u64::from(count))),
        RecurrenceInterval::Weekly => base.checked_add_days(Days::new(7 * u64::from(count))),
        RecurrenceInterval::Monthly => base.checked_add_months(Months::new(count)),
        RecurrenceInterval::Quarterly => base.checked_add_months(Months::new(3 * count)),
        RecurrenceInterval::OneOff => Some(base),
    };
    CalendarDay(stepped.unwrap_or(base))
}

/// Whole-day signed difference `a - b`.
pub fn days_between(a: CalendarDay, b: CalendarDay) -> i64 {
    (a.0 - b.0).num_days()
}

/// Monday anchor of the week containing `day`. A Sunday belongs to the week
/// starting the preceding Monday.
pub fn week_start(day: CalendarDay) -> CalendarDay {
    let back = u64::from(day.0.weekday().num_days_from_monday());
    CalendarDay(day.0.checked_sub_days(Days::new(back)).unwrap_or(day.0))
}

/// Zero-based quarter index: Jan-Mar = 0, Apr-Jun = 1, and so on.
pub fn quarter_index(day: CalendarDay) -> u32 {
    (day.month() - 1) / 3
}
