//! Defines the recurring schedule model and its state transitions.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::ScheduleId,
    schedule::recurrence::{RecurrenceKind, RecurrenceParams, try_compute_next},
    tag::TagId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money flows into or out of the account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money coming in, e.g. wages.
    Credit,
    /// Money going out, e.g. rent.
    Debit,
}

/// Describes the transaction a schedule produces each time it fires.
///
/// The scheduler does not look inside the payload, it is handed to the
/// [ArtifactSink](crate::ArtifactSink) together with the occurrence date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulePayload {
    /// A short description of the transaction, e.g. "Rent".
    pub name: String,
    /// The size of the transaction, the sign is given by `direction`.
    pub amount: f64,
    /// Whether the transaction is income or an expense.
    pub direction: Direction,
    /// The tags to attach to the transaction.
    pub labels: Vec<TagId>,
}

/// A transaction that repeats on a regular basis (e.g., wages, phone bill).
///
/// New schedules are created with [ScheduleBuilder] and
/// [create_schedule](crate::create_schedule), and afterwards only move
/// forward through [fire](crate::fire) and [skip](crate::skip).
#[derive(Clone, Debug, PartialEq)]
pub struct RecurringSchedule {
    /// The ID of the schedule.
    pub id: ScheduleId,
    /// What to create each time the schedule fires.
    pub payload: SchedulePayload,
    /// How often the schedule repeats. Fixed once the schedule is created.
    pub kind: RecurrenceKind,
    /// The day/weekday/month the schedule repeats on.
    pub params: RecurrenceParams,
    /// The occurrence that will be fired next.
    pub next_occurrence: Option<Date>,
    /// The occurrence that was most recently fired.
    pub last_occurrence: Option<Date>,
    /// Inactive schedules are ignored by the catch-up pass.
    pub active: bool,
    /// Incremented on every write, used to detect concurrent modification.
    pub version: i64,
}

/// Where a schedule is in its lifecycle relative to some date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleState {
    /// The schedule is active and its next occurrence is in the future.
    Pending,
    /// The schedule is active and its next occurrence is on or before the date.
    Due,
    /// The schedule has been deactivated.
    Suspended,
    /// The schedule is active but has no next occurrence yet.
    Unscheduled,
}

impl Display for ScheduleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScheduleState::Pending => "pending",
            ScheduleState::Due => "due",
            ScheduleState::Suspended => "suspended",
            ScheduleState::Unscheduled => "unscheduled",
        };

        write!(f, "{name}")
    }
}

impl RecurringSchedule {
    /// Create a new schedule.
    ///
    /// Shortcut for [ScheduleBuilder] for discoverability.
    pub fn build(
        payload: SchedulePayload,
        kind: RecurrenceKind,
        params: RecurrenceParams,
    ) -> ScheduleBuilder {
        ScheduleBuilder {
            payload,
            kind,
            params,
            next_occurrence: None,
            active: true,
        }
    }

    /// The state of the schedule as of `as_of`.
    pub fn state(&self, as_of: Date) -> ScheduleState {
        if !self.active {
            return ScheduleState::Suspended;
        }

        match self.next_occurrence {
            Some(next) if next <= as_of => ScheduleState::Due,
            Some(_) => ScheduleState::Pending,
            None => ScheduleState::Unscheduled,
        }
    }

    /// Whether the schedule should be fired as of `as_of`.
    pub fn due(&self, as_of: Date) -> bool {
        self.state(as_of) == ScheduleState::Due
    }

    /// Record that the due occurrence was fired and move on to the next one.
    ///
    /// Returns the occurrence that was fired.
    ///
    /// # Errors
    /// Returns an [Error::InvalidState] if the schedule is not due as of
    /// `as_of`, or an [Error::OccurrenceOutOfRange] if the rule has no
    /// occurrence after the due one before [Date::MAX].
    pub(crate) fn advance_fired(&mut self, as_of: Date) -> Result<Date, Error> {
        let fired = self.advance(as_of)?;
        self.last_occurrence = Some(fired);

        Ok(fired)
    }

    /// Move past the due occurrence without recording it as fired.
    ///
    /// Returns the occurrence that was skipped.
    ///
    /// # Errors
    /// Returns an [Error::InvalidState] if the schedule is not due as of
    /// `as_of`, or an [Error::OccurrenceOutOfRange] if the rule has no
    /// occurrence after the due one before [Date::MAX].
    pub(crate) fn advance_skipped(&mut self, as_of: Date) -> Result<Date, Error> {
        self.advance(as_of)
    }

    fn advance(&mut self, as_of: Date) -> Result<Date, Error> {
        let state = self.state(as_of);
        let current = match (state, self.next_occurrence) {
            (ScheduleState::Due, Some(current)) => current,
            _ => return Err(Error::InvalidState(state)),
        };

        let next = current
            .next_day()
            .and_then(|day_after| try_compute_next(self.kind, &self.params, day_after))
            .ok_or(Error::OccurrenceOutOfRange(current))?;
        self.next_occurrence = Some(next);

        Ok(current)
    }
}

/// A builder for creating [RecurringSchedule] instances.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleBuilder {
    /// What to create each time the schedule fires.
    pub payload: SchedulePayload,
    /// How often the schedule repeats.
    pub kind: RecurrenceKind,
    /// The day/weekday/month the schedule repeats on.
    pub params: RecurrenceParams,
    /// The first occurrence. When `None` it is computed from today's date
    /// when the schedule is created.
    pub next_occurrence: Option<Date>,
    /// Whether the schedule starts out active.
    pub active: bool,
}

impl ScheduleBuilder {
    /// Set the first occurrence of the schedule.
    pub fn next_occurrence(mut self, next_occurrence: Option<Date>) -> Self {
        self.next_occurrence = next_occurrence;
        self
    }

    /// Set whether the schedule starts out active.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// The fields of a schedule that may be changed after creation.
///
/// The recurrence kind cannot be changed, create a new schedule instead.
/// Changing the parameters does not move the next occurrence.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleUpdate {
    /// What to create each time the schedule fires.
    pub payload: SchedulePayload,
    /// The day/weekday/month the schedule repeats on.
    pub params: RecurrenceParams,
}

// ============================================================================
// TESTS
// ============================================================================
