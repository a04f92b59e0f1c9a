use std::collections::BTreeSet;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::calendar::{add_interval, days_between, week_start, CalendarDay, RecurrenceInterval};
use crate::log::CompletionLog;

/// Which day of a coarse cycle the user expects to act on. Absent
/// preferences fall back to deterministic defaults documented on
/// [`missed_days`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrencePreferences {
    pub weekday: Option<Weekday>,
    pub day_of_month: Option<u32>,
}

impl OccurrencePreferences {
    fn preferred_day_of_month(&self) -> u32 {
        self.day_of_month.unwrap_or(1)
    }
}

/// Replays the expected-occurrence calendar from `created_on` up to (but
/// excluding) `today` and returns every expectation with no log entry and
/// no voiding, merged with the user's manually declared misses. Sorted and
/// deduplicated.
///
/// Expectation rules per interval:
/// - Daily: every day.
/// - Weekly with a preferred weekday: every day matching it.
/// - Weekly without a preference: one miss per Monday-to-Sunday week that
///   elapsed entirely before `today` with zero log entries, recorded as the
///   week's Monday. Partial weeks at either edge never count.
/// - Monthly: the preferred day-of-month (default the 1st).
/// - Quarterly: the preferred day-of-month in January, April, July or
///   October.
///
/// Voiding is idempotent: a day already in `voided_gaps` stays excluded no
/// matter how often it is voided again.
pub fn missed_days(
    log: &CompletionLog,
    interval: RecurrenceInterval,
    created_on: CalendarDay,
    voided_gaps: &BTreeSet<CalendarDay>,
    manual_misses: &BTreeSet<CalendarDay>,
    prefs: &OccurrencePreferences,
    today: CalendarDay,
) -> Vec<CalendarDay> {
    let logged = log.logged_days();
    let mut misses: BTreeSet<CalendarDay> = BTreeSet::new();

    match interval {
        RecurrenceInterval::Weekly if prefs.weekday.is_none() => {
            collect_empty_weeks(&logged, created_on, voided_gaps, today, &mut misses);
        }
        RecurrenceInterval::OneOff => {}
        _ => {
            let mut day = created_on;
            while day < today {
                if is_expected_occurrence(day, interval, prefs)
                    && !logged.contains(&day)
                    && !voided_gaps.contains(&day)
                {
                    misses.insert(day);
                }
                day = add_interval(day, RecurrenceInterval::Daily, 1);
            }
        }
    }

    for &declared in manual_misses {
        if !logged.contains(&declared) && !voided_gaps.contains(&declared) {
            misses.insert(declared);
        }
    }

    misses.into_iter().collect()
}

fn is_expected_occurrence(
    day: CalendarDay,
    interval: RecurrenceInterval,
    prefs: &OccurrencePreferences,
) -> bool {
    match interval {
        RecurrenceInterval::Daily => true,
        RecurrenceInterval::Weekly => prefs
            .weekday
            .map_or(false, |preferred| day.weekday() == preferred),
        RecurrenceInterval::Monthly => day.day() == prefs.preferred_day_of_month(),
        RecurrenceInterval::Quarterly => {
            day.day() == prefs.preferred_day_of_month()
                && matches!(day.month(), 1 | 4 | 7 | 10)
        }
        RecurrenceInterval::OneOff => false,
    }
}

/// The no-preference weekly fallback: only whole Monday-to-Sunday weeks
/// with zero completions become misses, keyed by their Monday.
fn collect_empty_weeks(
    logged: &BTreeSet<CalendarDay>,
    created_on: CalendarDay,
    voided_gaps: &BTreeSet<CalendarDay>,
    today: CalendarDay,
    misses: &mut BTreeSet<CalendarDay>,
) {
    let anchor = week_start(created_on);
    // A task created mid-week is not on the hook for that partial week.
    let mut monday = if created_on == anchor {
        anchor
    } else {
        add_interval(anchor, RecurrenceInterval::Weekly, 1)
    };

    loop {
        let sunday = add_interval(monday, RecurrenceInterval::Daily, 6);
        if days_between(today, sunday) <= 0 {
            break;
        }
        let has_entry = logged
            .range(monday..=sunday)
            .next()
            .is_some();
        if !has_entry && !voided_gaps.contains(&monday) {
            misses.insert(monday);
        }
        monday = add_interval(monday, RecurrenceInterval::Weekly, 1);
    }
}
