use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, ensure, Result};
use chrono::Local;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarDay, RecurrenceInterval};
use crate::log::LogEntry;
use crate::missed::OccurrencePreferences;
use crate::persistence::{PersistedRecurrence, PersistenceSink};
use crate::workflow::{CompleteOutcome, CycleStanding, RecurrenceState};

/// Stable identifier of a task, owned by the surrounding CRUD application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A task carrying recurrence bookkeeping. One `RecurrenceState` is
/// exclusively owned by its task; nothing is shared across tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTask {
    pub id: TaskId,
    pub title: String,
    pub recurrence: RecurrenceState,
}

/// In-memory service over the tasks' recurrence state. Each mutation is
/// applied and recomputed under the write lock as one logical step, then
/// handed to the persistence sink fire-and-forget.
pub struct TaskService {
    tasks: RwLock<HashMap<TaskId, RecurringTask>>,
    persistence_sink: Option<Box<dyn PersistenceSink>>,
}

pub struct TaskServiceBuilder {
    tasks: Vec<RecurringTask>,
    persistence_sink: Option<Box<dyn PersistenceSink>>,
}

impl TaskServiceBuilder {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            persistence_sink: None,
        }
    }

    /// Seeds a task restored from storage.
    pub fn add_task(mut self, id: TaskId, title: impl Into<String>, blob: PersistedRecurrence) -> Self {
        self.tasks.push(RecurringTask {
            id,
            title: title.into(),
            recurrence: blob.into_state(),
        });
        self
    }

    pub fn with_persistence_sink(mut self, sink: Box<dyn PersistenceSink>) -> Self {
        self.persistence_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<TaskService> {
        let mut tasks = HashMap::new();
        for task in self.tasks {
            ensure!(
                !tasks.contains_key(&task.id),
                "duplicate task id `{}`",
                task.id
            );
            tasks.insert(task.id.clone(), task);
        }
        Ok(TaskService {
            tasks: RwLock::new(tasks),
            persistence_sink: self.persistence_sink,
        })
    }
}

impl Default for TaskServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskService {
    pub fn builder() -> TaskServiceBuilder {
        TaskServiceBuilder::new()
    }

    /// Promotes a task to a recurring interval, creating its recurrence
    /// state as of today.
    pub fn promote(
        &self,
        id: TaskId,
        title: impl Into<String>,
        interval: RecurrenceInterval,
    ) -> Result<()> {
        ensure!(
            interval.is_recurring(),
            "cannot promote `{id}` to OneOff; use demote"
        );
        let today = CalendarDay::today();
        let mut tasks = self.tasks.write();
        ensure!(!tasks.contains_key(&id), "task `{id}` already promoted");
        let task = RecurringTask {
            id: id.clone(),
            title: title.into(),
            recurrence: RecurrenceState::new(interval, today, today),
        };
        self.persist(&task);
        tracing::debug!(task = %id, ?interval, "promoted to recurring");
        tasks.insert(id, task);
        Ok(())
    }

    /// Demotes a task back to OneOff, discarding its recurrence state.
    pub fn demote(&self, id: &TaskId) -> Result<()> {
        self.mutate(id, "demoted to one-off", |task, _today| {
            task.recurrence.reset();
        })
    }

    /// The user's "complete" tap. Reads the local clock once and routes
    /// through the workflow; an `AlreadySatisfied` outcome means nothing
    /// was logged and the caller should surface the bonus-or-undo prompt.
    pub fn complete(&self, id: &TaskId) -> Result<CompleteOutcome> {
        let time = Local::now().format("%H:%M").to_string();
        self.mutate(id, "completion logged", move |task, today| {
            task.recurrence.complete(today, Some(time))
        })
    }

    pub fn log_bonus(&self, id: &TaskId) -> Result<()> {
        self.mutate(id, "bonus logged", |task, today| {
            task.recurrence.log_bonus(today);
        })
    }

    pub fn undo_today(&self, id: &TaskId) -> Result<usize> {
        self.mutate(id, "today's entries removed", |task, today| {
            task.recurrence.undo_today(today)
        })
    }

    pub fn void_entry(&self, id: &TaskId, entry: &LogEntry) -> Result<bool> {
        self.mutate(id, "entry voided", |task, today| {
            task.recurrence.void_entry(entry, today)
        })
    }

    pub fn resolve_miss(&self, id: &TaskId, day: CalendarDay) -> Result<()> {
        self.mutate(id, "miss resolved", |task, today| {
            task.recurrence.resolve_miss(day, today);
        })
    }

    pub fn decline_miss(&self, id: &TaskId, day: CalendarDay) -> Result<()> {
        self.mutate(id, "miss declined", |task, today| {
            task.recurrence.decline_miss(day, today);
        })
    }

    pub fn declare_miss(&self, id: &TaskId, day: CalendarDay) -> Result<()> {
        self.mutate(id, "miss declared", |task, today| {
            task.recurrence.declare_miss(day, today);
        })
    }

    pub fn change_interval(&self, id: &TaskId, interval: RecurrenceInterval) -> Result<()> {
        if !interval.is_recurring() {
            return self.demote(id);
        }
        self.mutate(id, "interval changed", |task, today| {
            task.recurrence.change_interval(interval, today);
        })
    }

    pub fn set_preferences(&self, id: &TaskId, prefs: OccurrencePreferences) -> Result<()> {
        self.mutate(id, "preferences updated", |task, today| {
            task.recurrence.prefs = prefs;
            task.recurrence.recompute(today);
        })
    }

    pub fn snapshot(&self, id: &TaskId) -> Result<RecurringTask> {
        self.tasks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("task `{id}` not loaded"))
    }

    pub fn standing_of(&self, id: &TaskId) -> Result<CycleStanding> {
        let today = CalendarDay::today();
        Ok(self.snapshot(id)?.recurrence.standing(today))
    }

    pub fn streak_of(&self, id: &TaskId) -> Result<u32> {
        Ok(self.snapshot(id)?.recurrence.streak)
    }

    pub fn due_of(&self, id: &TaskId) -> Result<Option<CalendarDay>> {
        Ok(self.snapshot(id)?.recurrence.due_date)
    }

    pub fn missed_of(&self, id: &TaskId) -> Result<Vec<CalendarDay>> {
        let today = CalendarDay::today();
        Ok(self.snapshot(id)?.recurrence.missed(today))
    }

    pub fn list_tasks(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.tasks.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn mutate<T>(
        &self,
        id: &TaskId,
        action: &'static str,
        apply: impl FnOnce(&mut RecurringTask, CalendarDay) -> T,
    ) -> Result<T> {
        let today = CalendarDay::today();
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| anyhow!("task `{id}` not loaded"))?;
        let outcome = apply(task, today);
        self.persist(task);
        tracing::debug!(task = %id, streak = task.recurrence.streak, action);
        Ok(outcome)
    }

    fn persist(&self, task: &RecurringTask) {
        if let Some(sink) = &self.persistence_sink {
            sink.persist(&task.id, PersistedRecurrence::from_state(&task.recurrence));
        }
    }
}
