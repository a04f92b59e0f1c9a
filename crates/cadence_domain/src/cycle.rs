use crate::calendar::{quarter_index, week_start, CalendarDay, RecurrenceInterval};
use crate::log::CompletionLog;

/// Whether the current cycle (today / this week / this month / this
/// quarter) already has a qualifying completion. This is the single source
/// of truth consulted before a "complete" action decides between logging a
/// new occurrence and the overachiever prompt.
pub fn is_cycle_satisfied(
    log: &CompletionLog,
    interval: RecurrenceInterval,
    today: CalendarDay,
) -> bool {
    let Some(latest) = log.most_recent_day() else {
        return false;
    };
    match interval {
        RecurrenceInterval::Daily => latest == today,
        RecurrenceInterval::Weekly => week_start(latest) == week_start(today),
        RecurrenceInterval::Monthly => {
            (latest.year(), latest.month()) == (today.year(), today.month())
        }
        RecurrenceInterval::Quarterly => {
            latest.year() == today.year() && quarter_index(latest) == quarter_index(today)
        }
        RecurrenceInterval::OneOff => false,
    }
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
    fn empty_log_is_never_satisfied() {
        let log = CompletionLog::new();
        for interval in [
            RecurrenceInterval::Daily,
            RecurrenceInterval::Weekly,
            RecurrenceInterval::Monthly,
            RecurrenceInterval::Quarterly,
        ] {
            assert!(!is_cycle_satisfied(&log, interval, day("2024-01-03")));
        }
    }

    #[test]
    fn daily_requires_an_entry_today() {
        let log = log_of(&["2024-01-02", "2024-01-03"]);
        assert!(is_cycle_satisfied(&log, RecurrenceInterval::Daily, day("2024-01-03")));
        assert!(!is_cycle_satisfied(&log, RecurrenceInterval::Daily, day("2024-01-04")));
    }

    #[test]
    fn weekly_compares_monday_anchored_weeks() {
        // 2024-01-15 Monday through 2024-01-21 Sunday are one week.
        let log = log_of(&["2024-01-15"]);
        assert!(is_cycle_satisfied(&log, RecurrenceInterval::Weekly, day("2024-01-21")));
        assert!(!is_cycle_satisfied(&log, RecurrenceInterval::Weekly, day("2024-01-22")));

        // A Sunday completion belongs to the week starting the prior Monday.
        let sunday = log_of(&["2024-01-21"]);
        assert!(is_cycle_satisfied(&sunday, RecurrenceInterval::Weekly, day("2024-01-16")));
    }

    #[test]
    fn monthly_compares_year_and_month() {
        let log = log_of(&["2024-01-15"]);
        assert!(is_cycle_satisfied(&log, RecurrenceInterval::Monthly, day("2024-01-31")));
        assert!(!is_cycle_satisfied(&log, RecurrenceInterval::Monthly, day("2024-02-01")));
        assert!(!is_cycle_satisfied(&log, RecurrenceInterval::Monthly, day("2025-01-15")));
    }

    #[test]
    fn quarterly_compares_year_and_quarter() {
        let log = log_of(&["2024-02-10"]);
        assert!(is_cycle_satisfied(&log, RecurrenceInterval::Quarterly, day("2024-03-31")));
        assert!(!is_cycle_satisfied(&log, RecurrenceInterval::Quarterly, day("2024-04-01")));
        assert!(!is_cycle_satisfied(&log, RecurrenceInterval::Quarterly, day("2025-02-10")));
    }

    #[test]
    fn satisfaction_is_monotone_within_a_cycle() {
        let log = log_of(&["2024-01-16"]);
        // Once satisfied mid-week, every later day of the same week stays satisfied.
        for later in ["2024-01-16", "2024-01-17", "2024-01-19", "2024-01-21"] {
            assert!(is_cycle_satisfied(&log, RecurrenceInterval::Weekly, day(later)));
        }
    }

    #[test]
    fn one_off_never_satisfies() {
        let log = log_of(&["2024-01-03"]);
        assert!(!is_cycle_satisfied(&log, RecurrenceInterval::OneOff, day("2024-01-03")));
    }
}
