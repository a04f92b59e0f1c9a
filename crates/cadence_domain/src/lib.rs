pub mod calendar;
pub mod cycle;
pub mod log;
pub mod missed;
pub mod persistence;
pub mod schedule;
pub mod service;
pub mod streak;
pub mod workflow;

pub use crate::calendar::{CalendarDay, RecurrenceInterval};
pub use crate::service::{TaskId, TaskService, TaskServiceBuilder};
pub use crate::workflow::{CompleteOutcome, CycleStanding, RecurrenceState};
