use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarDay, RecurrenceInterval};
use crate::log::{CompletionLog, LogEntry};
use crate::missed::OccurrencePreferences;
use crate::service::TaskId;
use crate::workflow::RecurrenceState;

/// Snapshot of one task's recurrence bookkeeping in the shape the storage
/// layer writes back: a list of day+annotation pairs plus two day sets.
/// The core treats the persisted form as opaque beyond this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecurrence {
    pub interval: RecurrenceInterval,
    pub created_on: CalendarDay,
    pub due_date: Option<CalendarDay>,
    pub entries: Vec<LogEntry>,
    pub voided_gaps: Vec<CalendarDay>,
    pub manual_misses: Vec<CalendarDay>,
    pub prefs: OccurrencePreferences,
    pub streak: u32,
}

impl PersistedRecurrence {
    pub fn from_state(state: &RecurrenceState) -> Self {
        Self {
            interval: state.interval,
            created_on: state.created_on,
            due_date: state.due_date,
            entries: state.log.entries().to_vec(),
            voided_gaps: state.voided_gaps.iter().copied().collect(),
            manual_misses: state.manual_misses.iter().copied().collect(),
            prefs: state.prefs,
            streak: state.streak,
        }
    }

    pub fn into_state(self) -> RecurrenceState {
        RecurrenceState {
            interval: self.interval,
            log: CompletionLog::from_entries(self.entries),
            created_on: self.created_on,
            due_date: self.due_date,
            voided_gaps: self.voided_gaps.into_iter().collect(),
            manual_misses: self.manual_misses.into_iter().collect(),
            prefs: self.prefs,
            streak: self.streak,
        }
    }
}

/// Storage adapters implement this to receive write-backs. Persistence is
/// fire-and-forget from the engine's perspective: the call must not block
/// on I/O, and the engine never waits on an acknowledgement.
pub trait PersistenceSink: Send + Sync {
    fn persist(&self, task: &TaskId, blob: PersistedRecurrence);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trips_through_state() {
        let today = CalendarDay::parse("2024-01-02").unwrap();
        let mut state = RecurrenceState::new(
            RecurrenceInterval::Daily,
            CalendarDay::parse("2024-01-01").unwrap(),
            today,
        );
        state.complete(today, Some("08:00".into()));
        state.decline_miss(CalendarDay::parse("2024-01-01").unwrap(), today);

        let blob = PersistedRecurrence::from_state(&state);
        assert_eq!(blob.into_state(), state);
    }
}
