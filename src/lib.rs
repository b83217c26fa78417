//! Budgeteur recurring transactions.
//!
//! This library computes when recurring transactions (wages, rent, phone
//! bills, subscriptions) are next due, fires them into the ledger exactly
//! once per elapsed period and catches up schedules that have fallen behind.
//!
//! The entry points are:
//! - [compute_next] for the pure calendar calculation,
//! - [fire], [skip] and [set_active] for operating on a single schedule,
//! - [run_due] and [catch_up] for the batch pass over all due schedules.

#![warn(missing_docs)]

use time::Date;

mod clock;
mod database_id;
mod db;
mod logging;
mod rule;
mod schedule;
mod tag;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use clock::{Clock, FixedClock, LocalClock};
pub use database_id::{DatabaseId, ScheduleId, TransactionId};
pub use db::initialize as initialize_db;
pub use logging::{DEFAULT_LOG_PATH, setup_logging};
pub use rule::{Rule, RuleId, create_rule, delete_rule, get_all_rules, matching_tag_id};
pub use schedule::{
    ArtifactSink, CatchUpReport, DayOfMonth, DayOfWeek, Direction, MonthOfYear,
    OCCURRENCES_PER_PASS, RecurrenceKind, RecurrenceParams, RecurringSchedule, ScheduleBuilder,
    SchedulePayload, ScheduleState, ScheduleUpdate, catch_up, compute_next, create_schedule,
    delete_schedule, fire, get_all_schedules, get_due_schedules, get_schedule, run_due,
    set_active, skip, update_schedule,
};
pub use tag::{Tag, TagId, TagName, create_tag, get_all_tags, get_tag};
pub use transaction::{
    Transaction, TransactionBuilder, TransactionSink, count_transactions, create_transaction,
    get_transaction, get_transactions, get_transactions_after_catch_up,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A day of the month outside of 1-31 was given for a schedule.
    #[error("{0} is not a valid day of the month, expected a number from 1 to 31")]
    InvalidDayOfMonth(u8),

    /// A day of the week outside of 0-6 was given for a schedule.
    #[error("{0} is not a valid day of the week, expected a number from 0 (Sunday) to 6 (Saturday)")]
    InvalidWeekday(u8),

    /// A month outside of 1-12 was given for a schedule.
    #[error("{0} is not a valid month, expected a number from 1 to 12")]
    InvalidMonthOfYear(u8),

    /// The recurrence kind was missing or is not one of monthly, weekly or yearly.
    #[error("\"{0}\" is not a valid recurrence kind, expected monthly, weekly or yearly")]
    InvalidRecurrenceKind(String),

    /// A schedule was fired or skipped while it was not due.
    ///
    /// Callers should check [RecurringSchedule::due] first, however the
    /// operations check again inside the database transaction.
    #[error("the schedule is {0}, only due schedules can be fired or skipped")]
    InvalidState(ScheduleState),

    /// The schedule changed in the database since the caller read it.
    ///
    /// Usually this means another caller fired or skipped the schedule
    /// first. Re-read the schedule before trying again.
    #[error("schedule {0} was modified by another caller")]
    ScheduleConflict(ScheduleId),

    /// Firing a schedule would move its next occurrence past the largest
    /// supported date.
    #[error("cannot advance past {0}, the last supported date")]
    OccurrenceOutOfRange(Date),

    /// The tag ID used to create a transaction did not match a valid tag.
    #[error("the tag ID does not refer to a valid tag")]
    InvalidTag(Option<TagId>),

    /// An empty string was used to create a tag name.
    #[error("Tag name cannot be empty")]
    EmptyTagName,

    /// A tag with the same name already exists.
    #[error("a tag named \"{0}\" already exists")]
    DuplicateTagName(TagName),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing or deserializing JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a schedule that does not exist
    #[error("tried to update a schedule that is not in the database")]
    UpdateMissingSchedule,

    /// Tried to delete a schedule that does not exist
    #[error("tried to delete a schedule that is not in the database")]
    DeleteMissingSchedule,

    /// Tried to delete a rule that does not exist
    #[error("tried to delete a rule that is not in the database")]
    DeleteMissingRule,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}
