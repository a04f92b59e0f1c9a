use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarDay, RecurrenceInterval};
use crate::cycle::is_cycle_satisfied;
use crate::log::{CompletionLog, LogEntry};
use crate::missed::{missed_days, OccurrencePreferences};
use crate::schedule::next_due_date;
use crate::streak;

pub const BONUS_ANNOTATION: &str = "(BONUS)";
pub const RESOLVED_ANNOTATION: &str = "(RESOLVED)";

/// Where the task stands within its current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleStanding {
    Active,
    Satisfied,
}

/// What a `complete` action did. `AlreadySatisfied` is the overachiever
/// decision point: nothing was logged, and the caller must follow up with
/// either `log_bonus` or `undo_today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
    Logged,
    AlreadySatisfied,
}

/// Recurrence bookkeeping attached to one task. The `streak` and
/// `due_date` fields are caches; every mutation recomputes them in the
/// same logical step, so they are never read stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceState {
    pub interval: RecurrenceInterval,
    pub log: CompletionLog,
    pub created_on: CalendarDay,
    pub due_date: Option<CalendarDay>,
    pub voided_gaps: BTreeSet<CalendarDay>,
    pub manual_misses: BTreeSet<CalendarDay>,
    pub prefs: OccurrencePreferences,
    pub streak: u32,
}

impl RecurrenceState {
    /// Fresh state for a task promoted to a recurring interval.
    pub fn new(interval: RecurrenceInterval, created_on: CalendarDay, today: CalendarDay) -> Self {
        let mut state = Self {
            interval,
            log: CompletionLog::new(),
            created_on,
            due_date: None,
            voided_gaps: BTreeSet::new(),
            manual_misses: BTreeSet::new(),
            prefs: OccurrencePreferences::default(),
            streak: 0,
        };
        state.recompute(today);
        state
    }

    pub fn with_prefs(mut self, prefs: OccurrencePreferences) -> Self {
        self.prefs = prefs;
        self
    }

    pub fn standing(&self, today: CalendarDay) -> CycleStanding {
        if is_cycle_satisfied(&self.log, self.interval, today) {
            CycleStanding::Satisfied
        } else {
            CycleStanding::Active
        }
    }

    /// Routes a user's "complete" action. An unsatisfied cycle gets a log
    /// entry for today (carrying the caller's clock-time annotation) and
    /// the derived fields move forward. A satisfied cycle logs nothing and
    /// reports `AlreadySatisfied` instead, so the caller can ask the user
    /// whether they meant a bonus or an undo.
    pub fn complete(
        &mut self,
        today: CalendarDay,
        time_annotation: Option<String>,
    ) -> CompleteOutcome {
        match self.standing(today) {
            CycleStanding::Satisfied => CompleteOutcome::AlreadySatisfied,
            CycleStanding::Active => {
                self.log.append(LogEntry::on(today, time_annotation));
                self.recompute(today);
                CompleteOutcome::Logged
            }
        }
    }

    /// Logs an extra completion for an already-satisfied cycle.
    pub fn log_bonus(&mut self, today: CalendarDay) {
        self.log
            .append(LogEntry::on(today, Some(BONUS_ANNOTATION.to_string())));
        self.recompute(today);
    }

    /// Removes every entry dated today, dropping the cycle back to
    /// `Active`. Returns how many entries were removed.
    pub fn undo_today(&mut self, today: CalendarDay) -> usize {
        let removed = self.log.remove_all_on(today);
        self.recompute(today);
        removed
    }

    /// Removes one exact entry, chosen by the user; same-day entries with
    /// different annotations stay apart, so a specific bonus can be voided
    /// without touching the plain completion.
    pub fn void_entry(&mut self, entry: &LogEntry, today: CalendarDay) -> bool {
        let removed = self.log.remove_entry(entry);
        self.recompute(today);
        removed
    }

    /// Turns a detected miss into a completion by appending a
    /// `(RESOLVED)`-annotated entry for that day.
    pub fn resolve_miss(&mut self, day: CalendarDay, today: CalendarDay) {
        self.log
            .append(LogEntry::on(day, Some(RESOLVED_ANNOTATION.to_string())));
        self.recompute(today);
    }

    /// Permanently dismisses a miss. Idempotent.
    pub fn decline_miss(&mut self, day: CalendarDay, today: CalendarDay) {
        self.voided_gaps.insert(day);
        self.recompute(today);
    }

    /// Flags a day the user insists was missed even if the reconstructor
    /// did not detect it.
    pub fn declare_miss(&mut self, day: CalendarDay, today: CalendarDay) {
        self.manual_misses.insert(day);
        self.recompute(today);
    }

    /// Changing the interval keeps the log but reinterprets it; every
    /// derived field is rebuilt under the new cadence.
    pub fn change_interval(&mut self, interval: RecurrenceInterval, today: CalendarDay) {
        self.interval = interval;
        self.recompute(today);
    }

    /// Demotion back to OneOff discards the recurrence bookkeeping.
    pub fn reset(&mut self) {
        self.interval = RecurrenceInterval::OneOff;
        self.log = CompletionLog::new();
        self.voided_gaps.clear();
        self.manual_misses.clear();
        self.due_date = None;
        self.streak = 0;
    }

    pub fn missed(&self, today: CalendarDay) -> Vec<CalendarDay> {
        missed_days(
            &self.log,
            self.interval,
            self.created_on,
            &self.voided_gaps,
            &self.manual_misses,
            &self.prefs,
            today,
        )
    }

    pub(crate) fn recompute(&mut self, today: CalendarDay) {
        self.streak = streak::streak(&self.log, self.interval, today);
        self.due_date = if self.interval.is_recurring() {
            Some(next_due_date(&self.log, self.interval, today))
        } else {
            None
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(text: &str) -> CalendarDay {
        CalendarDay::parse(text).expect("valid day")
    }

    fn daily_state(created: &str, today: &str) -> RecurrenceState {
        RecurrenceState::new(RecurrenceInterval::Daily, day(created), day(today))
    }

    #[test]
    fn fresh_state_is_active_and_due_today() {
        let state = daily_state("2024-01-01", "2024-01-01");
        assert_eq!(state.standing(day("2024-01-01")), CycleStanding::Active);
        assert_eq!(state.streak, 0);
        assert_eq!(state.due_date, Some(day("2024-01-01")));
    }

    #[test]
    fn complete_logs_once_then_hits_the_overachiever_gate() {
        let mut state = daily_state("2024-01-01", "2024-01-01");
        let today = day("2024-01-01");

        assert_eq!(state.complete(today, Some("09:15".into())), CompleteOutcome::Logged);
        assert_eq!(state.standing(today), CycleStanding::Satisfied);
        assert_eq!(state.streak, 1);
        assert_eq!(state.due_date, Some(day("2024-01-02")));
        assert_eq!(state.log.len(), 1);

        // Second tap in the same cycle must not append anything.
        assert_eq!(
            state.complete(today, Some("18:40".into())),
            CompleteOutcome::AlreadySatisfied
        );
        assert_eq!(state.log.len(), 1);
    }

    #[test]
    fn bonus_appends_and_stays_satisfied() {
        let mut state = daily_state("2024-01-01", "2024-01-01");
        let today = day("2024-01-01");
        state.complete(today, None);
        state.log_bonus(today);

        assert_eq!(state.log.len(), 2);
        assert_eq!(state.standing(today), CycleStanding::Satisfied);
        assert_eq!(state.streak, 2);
        assert_eq!(
            state.log.entries()[1].annotation.as_deref(),
            Some(BONUS_ANNOTATION)
        );
    }

    #[test]
    fn undo_today_clears_the_cycle_and_recomputes() {
        let mut state = daily_state("2024-01-01", "2024-01-01");
        let today = day("2024-01-02");
        state.complete(day("2024-01-01"), None);
        state.complete(today, None);
        state.log_bonus(today);

        assert_eq!(state.undo_today(today), 2);
        assert_eq!(state.standing(today), CycleStanding::Active);
        assert_eq!(state.streak, 1);
        assert_eq!(state.due_date, Some(today));
    }

    #[test]
    fn voiding_a_specific_bonus_leaves_the_plain_entry() {
        let mut state = daily_state("2024-02-05", "2024-02-05");
        let today = day("2024-02-05");
        state.complete(today, None);
        state.log_bonus(today);

        let bonus = state.log.entries()[1].clone();
        assert!(state.void_entry(&bonus, today));
        assert_eq!(state.log.len(), 1);
        assert_eq!(state.log.entries()[0].annotation, None);
        assert_eq!(state.streak, 1);
    }

    #[test]
    fn resolve_miss_appends_a_resolved_entry() {
        let mut state = daily_state("2024-01-01", "2024-01-03");
        let today = day("2024-01-03");
        assert_eq!(state.missed(today), vec![day("2024-01-01"), day("2024-01-02")]);

        state.resolve_miss(day("2024-01-01"), today);
        assert_eq!(state.missed(today), vec![day("2024-01-02")]);
        assert_eq!(
            state.log.entries()[0].annotation.as_deref(),
            Some(RESOLVED_ANNOTATION)
        );
    }

    #[test]
    fn decline_miss_is_idempotent() {
        let mut state = daily_state("2024-01-01", "2024-01-03");
        let today = day("2024-01-03");
        state.decline_miss(day("2024-01-01"), today);
        let after_once = state.missed(today);
        state.decline_miss(day("2024-01-01"), today);
        assert_eq!(state.missed(today), after_once);
        assert_eq!(after_once, vec![day("2024-01-02")]);
    }

    #[test]
    fn declare_miss_surfaces_undetected_days() {
        let mut state = RecurrenceState::new(
            RecurrenceInterval::Monthly,
            day("2024-01-01"),
            day("2024-01-20"),
        );
        let today = day("2024-01-20");
        state.complete(day("2024-01-01"), None);

        state.declare_miss(day("2024-01-10"), today);
        assert_eq!(state.missed(today), vec![day("2024-01-10")]);
    }

    #[test]
    fn interval_change_keeps_the_log_and_reinterprets_it() {
        let mut state = daily_state("2024-01-01", "2024-01-01");
        state.complete(day("2024-01-01"), None);
        state.complete(day("2024-01-02"), None);

        // Ten days later the daily streak is dead...
        let later = day("2024-01-12");
        state.change_interval(RecurrenceInterval::Monthly, later);
        // ...but the same two entries form a monthly streak of 2.
        assert_eq!(state.log.len(), 2);
        assert_eq!(state.streak, 2);
    }

    #[test]
    fn reset_discards_recurrence_bookkeeping() {
        let mut state = daily_state("2024-01-01", "2024-01-01");
        state.complete(day("2024-01-01"), None);
        state.reset();

        assert_eq!(state.interval, RecurrenceInterval::OneOff);
        assert!(state.log.is_empty());
        assert_eq!(state.streak, 0);
        assert_eq!(state.due_date, None);
    }
}
