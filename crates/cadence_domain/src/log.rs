use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarDay;

/// One "done" event. `stamp` is the raw day text as entered or persisted
/// (a plain `YYYY-MM-DD` or one carrying a time suffix); `annotation` is
/// display-only free text such as a clock time, `(BONUS)` or `(RESOLVED)`,
/// and is never parsed for logic. The pair as a whole identifies an entry,
/// so duplicate days with different annotations stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub stamp: String,
    pub annotation: Option<String>,
}

impl LogEntry {
    pub fn on(day: CalendarDay, annotation: Option<String>) -> Self {
        Self {
            stamp: day.to_string(),
            annotation,
        }
    }

    pub fn raw(stamp: impl Into<String>, annotation: Option<String>) -> Self {
        Self {
            stamp: stamp.into(),
            annotation,
        }
    }

    /// The entry's calendar day, or `None` for an unparsable stamp.
    /// Computations skip such entries instead of failing (malformed stamps
    /// are the one tolerated error class).
    pub fn day(&self) -> Option<CalendarDay> {
        CalendarDay::parse(&self.stamp).ok()
    }
}

/// Append-only completion log of one task. Entries keep insertion order,
/// are never deduplicated and never mutated in place; corrections remove a
/// specific entry or append a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionLog {
    entries: Vec<LogEntry>,
}

impl CompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Removes the first entry equal to `entry` as a (stamp, annotation)
    /// pair. Returns whether anything was removed.
    pub fn remove_entry(&mut self, entry: &LogEntry) -> bool {
        match self.entries.iter().position(|candidate| candidate == entry) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes every entry dated `day`, returning how many went away.
    pub fn remove_all_on(&mut self, day: CalendarDay) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.day() != Some(day));
        before - self.entries.len()
    }

    /// All parsable entry days in ascending order. The sort is stable, so
    /// same-day entries keep their insertion order. Unparsable stamps are
    /// skipped.
    pub fn sorted_days(&self) -> Vec<CalendarDay> {
        let mut days: Vec<CalendarDay> =
            self.entries.iter().filter_map(LogEntry::day).collect();
        days.sort();
        days
    }

    /// The distinct set of parsable days, for membership checks.
    pub fn logged_days(&self) -> BTreeSet<CalendarDay> {
        self.entries.iter().filter_map(LogEntry::day).collect()
    }

    pub fn most_recent_day(&self) -> Option<CalendarDay> {
        self.entries.iter().filter_map(LogEntry::day).max()
    }
}
