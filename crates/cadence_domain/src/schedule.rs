use crate::calendar::{add_interval, CalendarDay, RecurrenceInterval};
use crate::cycle::is_cycle_satisfied;
use crate::log::CompletionLog;

/// The next day this task is due. A satisfied cycle schedules one interval
/// past the most recent completion, rolled forward past any stale dates;
/// an unsatisfied cycle is due right now. The result is never before
/// `today`.
pub fn next_due_date(
    log: &CompletionLog,
    interval: RecurrenceInterval,
    today: CalendarDay,
) -> CalendarDay {
    if !interval.is_recurring() {
        return today;
    }
    if is_cycle_satisfied(log, interval, today) {
        match log.most_recent_day() {
            Some(latest) => advance_past(latest, interval, today),
            None => today,
        }
    } else {
        today
    }
}

/// Adds one interval to `day`, then keeps adding intervals while the result
/// is still before `today`. Long stretches of inactivity therefore roll the
/// due date forward instead of surfacing a stale one.
pub fn advance_past(
    day: CalendarDay,
    interval: RecurrenceInterval,
    today: CalendarDay,
) -> CalendarDay {
    if !interval.is_recurring() {
        return today;
    }
    let mut due = add_interval(day, interval, 1);
    while due < today {
        due = add_interval(due, interval, 1);
    }
    due
}
