use crate::calendar::{days_between, CalendarDay, RecurrenceInterval};
use crate::log::CompletionLog;

/// Per-interval tolerance window in days. These are deliberately generous
/// upper bounds (31 for monthly, 92 for quarterly) rather than exact
/// calendar-cycle lengths; the forgiving window is a product decision and
/// must not be tightened to true cycle arithmetic.
pub fn tolerance_days(interval: RecurrenceInterval) -> i64 {
    match interval {
        RecurrenceInterval::Daily => 1,
        RecurrenceInterval::Weekly => 7,
        RecurrenceInterval::Monthly => 31,
        RecurrenceInterval::Quarterly => 92,
        RecurrenceInterval::OneOff => 0,
    }
}

/// Unbroken streak length, walking the sorted log backward from the most
/// recent entry and counting adjacent entries whose day gap stays within
/// tolerance. A most-recent entry staler than the tolerance window breaks
/// the whole streak to 0. Counts consecutive log entries, not calendar
/// cycles, so same-day bonus entries each extend the chain.
pub fn streak(log: &CompletionLog, interval: RecurrenceInterval, today: CalendarDay) -> u32 {
    let days = log.sorted_days();
    let Some(&latest) = days.last() else {
        return 0;
    };
    let tolerance = tolerance_days(interval);
    if days_between(today, latest) > tolerance {
        return 0;
    }

    let mut count = 1u32;
    for pair in days.windows(2).rev() {
        if days_between(pair[1], pair[0]) <= tolerance {
            count += 1;
        } else {
            break;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogEntry;

    fn day(text: &str) -> CalendarDay {
        CalendarDay::parse(text).expect("valid day")
    }

    fn log_of(stamps: &[&str]) -> CompletionLog {
        CompletionLog::from_entries(
            stamps
                .iter()
                .map(|stamp| LogEntry::raw(*stamp, None))
                .collect(),
        )
    }

    #[test]
    fn empty_log_has_no_streak() {
        assert_eq!(
            streak(&CompletionLog::new(), RecurrenceInterval::Daily, day("2024-01-01")),
            0
        );
    }

    #[test]
    fn counts_consecutive_daily_entries() {
        let log = log_of(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(streak(&log, RecurrenceInterval::Daily, day("2024-01-03")), 3);
    }

    #[test]
    fn stale_latest_entry_breaks_the_streak() {
        // A 9-day gap exceeds the daily tolerance of 1.
        let log = log_of(&["2024-01-01"]);
        assert_eq!(streak(&log, RecurrenceInterval::Daily, day("2024-01-10")), 0);
    }

    #[test]
    fn stops_at_the_first_gap_beyond_tolerance() {
        let log = log_of(&["2024-01-01", "2024-01-05", "2024-01-06", "2024-01-07"]);
        assert_eq!(streak(&log, RecurrenceInterval::Daily, day("2024-01-07")), 3);
    }

    #[test]
    fn unsorted_input_is_sorted_before_walking() {
        let log = log_of(&["2024-01-03", "2024-01-01", "2024-01-02"]);
        assert_eq!(streak(&log, RecurrenceInterval::Daily, day("2024-01-03")), 3);
    }

    #[test]
    fn same_day_entries_each_count() {
        let mut log = log_of(&["2024-02-05"]);
        log.append(LogEntry::raw("2024-02-05", Some("(BONUS)".into())));
        assert_eq!(streak(&log, RecurrenceInterval::Daily, day("2024-02-05")), 2);
    }

    #[test]
    fn weekly_tolerance_spans_seven_days() {
        let log = log_of(&["2024-01-01", "2024-01-08", "2024-01-15"]);
        assert_eq!(streak(&log, RecurrenceInterval::Weekly, day("2024-01-18")), 3);
        assert_eq!(streak(&log, RecurrenceInterval::Weekly, day("2024-01-23")), 0);
    }

    #[test]
    fn monthly_tolerance_allows_same_month_pairs() {
        // Two completions 20 days apart both fit the 31-day window; the
        // documented looseness counts them as a 2-streak.
        let log = log_of(&["2024-03-01", "2024-03-21"]);
        assert_eq!(streak(&log, RecurrenceInterval::Monthly, day("2024-03-25")), 2);
    }

    #[test]
    fn streak_never_exceeds_log_length() {
        let log = log_of(&["2024-01-01", "2024-01-02", "bad-stamp", "2024-01-03"]);
        let result = streak(&log, RecurrenceInterval::Daily, day("2024-01-03"));
        assert!(result as usize <= log.len());
        assert_eq!(result, 3);
    }
}
