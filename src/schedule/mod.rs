//! Recurring schedules for transactions that repeat on a calendar.
//!
//! This module contains everything related to recurring schedules:
//! - The recurrence rules and the calculation of the next occurrence
//! - The `RecurringSchedule` model and its state transitions
//! - Database functions for storing and querying schedules
//! - Firing, skipping and the batch catch-up pass

mod catch_up;
mod core;
mod db;
mod recurrence;
mod runner;

pub use catch_up::{CatchUpReport, OCCURRENCES_PER_PASS, catch_up, run_due};
pub use core::{
    Direction, RecurringSchedule, ScheduleBuilder, SchedulePayload, ScheduleState, ScheduleUpdate,
};
pub use db::{
    create_schedule, create_schedule_table, delete_schedule, get_all_schedules,
    get_due_schedules, get_schedule, update_schedule,
};
pub use recurrence::{
    DayOfMonth, DayOfWeek, MonthOfYear, RecurrenceKind, RecurrenceParams, compute_next,
};
pub use runner::{ArtifactSink, fire, set_active, skip};
