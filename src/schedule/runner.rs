//! Operations that move a single schedule through its lifecycle.
//!
//! Firing and skipping each run inside one SQLite transaction. The
//! transaction re-reads the schedule, checks that it is still due and
//! unchanged since the caller read it, and writes the new occurrence dates.
//! Anything that fails along the way rolls back the whole transaction, so a
//! schedule is never advanced without its artifact or the other way around.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use time::Date;

use crate::{
    Error,
    database_id::ScheduleId,
    schedule::{
        core::{RecurringSchedule, SchedulePayload},
        db::{get_schedule, save_occurrences, update_active},
    },
};

/// Creates the record produced when a schedule fires, e.g. a ledger transaction.
pub trait ArtifactSink {
    /// What the sink creates.
    type Artifact;

    /// Create an artifact for `payload` dated `effective_date`.
    ///
    /// `connection` is the database transaction the schedule update runs in.
    /// Implementers that write to the database should write through it so
    /// that their writes are rolled back if the schedule cannot be saved.
    ///
    /// # Errors
    /// Implementers should return an error if the artifact could not be
    /// created. The schedule is then left unchanged.
    fn create(
        &self,
        payload: &SchedulePayload,
        effective_date: Date,
        connection: &Connection,
    ) -> Result<Self::Artifact, Error>;
}

/// Fire the due occurrence of `schedule`.
///
/// The artifact is dated to the occurrence that was due rather than to
/// `as_of`, so firing a schedule late still produces a correctly dated
/// record. Afterwards the schedule's last occurrence is the fired one, and
/// its next occurrence is the first one after it.
///
/// # Errors
/// This function will return an:
/// - [Error::InvalidState] if the schedule is not due as of `as_of`,
/// - [Error::ScheduleConflict] if the schedule was changed since `schedule` was read,
/// - [Error::NotFound] if the schedule has been deleted,
/// - any error returned by `sink`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn fire<S: ArtifactSink>(
    schedule: &RecurringSchedule,
    as_of: Date,
    sink: &S,
    connection: &Connection,
) -> Result<S::Artifact, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let mut current = get_unchanged_schedule(schedule, &transaction)?;
    let occurrence = current.advance_fired(as_of)?;
    let artifact = sink.create(&current.payload, occurrence, &transaction)?;
    let saved = save_occurrences(&current, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "fired schedule {} \"{}\" for {occurrence}, next occurrence {:?}",
        saved.id,
        saved.payload.name,
        saved.next_occurrence
    );

    Ok(artifact)
}

/// Move past the due occurrence of `schedule` without creating an artifact.
///
/// The last occurrence is left as is, since nothing was fired.
///
/// # Errors
/// This function will return an:
/// - [Error::InvalidState] if the schedule is not due as of `as_of`,
/// - [Error::ScheduleConflict] if the schedule was changed since `schedule` was read,
/// - [Error::NotFound] if the schedule has been deleted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn skip(
    schedule: &RecurringSchedule,
    as_of: Date,
    connection: &Connection,
) -> Result<RecurringSchedule, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let mut current = get_unchanged_schedule(schedule, &transaction)?;
    let occurrence = current.advance_skipped(as_of)?;
    let saved = save_occurrences(&current, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "skipped schedule {} \"{}\" for {occurrence}, next occurrence {:?}",
        saved.id,
        saved.payload.name,
        saved.next_occurrence
    );

    Ok(saved)
}

/// Activate or deactivate a schedule.
///
/// Deactivated schedules keep their occurrence dates, and become due again
/// as soon as they are reactivated if their next occurrence has passed.
///
/// # Errors
/// This function will return an [Error::UpdateMissingSchedule] if `id` does
/// not refer to a valid schedule, or an [Error::SqlError] if there is an SQL
/// error.
pub fn set_active(
    id: ScheduleId,
    active: bool,
    connection: &Connection,
) -> Result<RecurringSchedule, Error> {
    let schedule = update_active(id, active, connection)?;

    tracing::info!(
        "{} schedule {} \"{}\"",
        if active { "activated" } else { "deactivated" },
        schedule.id,
        schedule.payload.name
    );

    Ok(schedule)
}

fn get_unchanged_schedule(
    snapshot: &RecurringSchedule,
    connection: &Connection,
) -> Result<RecurringSchedule, Error> {
    let current = get_schedule(snapshot.id, connection)?;

    if current.version != snapshot.version {
        return Err(Error::ScheduleConflict(snapshot.id));
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use time::{Date, macros::date};

    use crate::{
        Error,
        schedule::{
            core::{RecurringSchedule, ScheduleState},
            db::{create_schedule, get_schedule},
            recurrence::{DayOfMonth, DayOfWeek, RecurrenceKind, RecurrenceParams},
        },
        test_utils::{FailingSink, RecordingSink, get_test_connection, rent_payload},
        transaction::{TransactionSink, count_transactions, get_transaction},
    };

    use super::{fire, set_active, skip};

    fn create_monthly(
        day: u8,
        next: Date,
        connection: &rusqlite::Connection,
    ) -> RecurringSchedule {
        create_schedule(
            RecurringSchedule::build(
                rent_payload(),
                RecurrenceKind::Monthly,
                RecurrenceParams {
                    day_of_month: Some(DayOfMonth::new(day).unwrap()),
                    ..Default::default()
                },
            )
            .next_occurrence(Some(next)),
            next,
            connection,
        )
        .expect("Could not create schedule")
    }

    #[test]
    fn fire_monthly_31st_clips_through_leap_february() {
        let connection = get_test_connection();
        let schedule = create_monthly(31, date!(2024 - 01 - 31), &connection);
        let as_of = date!(2024 - 03 - 01);

        let first = fire(&schedule, as_of, &TransactionSink, &connection).unwrap();
        let schedule = get_schedule(schedule.id, &connection).unwrap();

        assert_eq!(first.date, date!(2024 - 01 - 31));
        assert_eq!(schedule.last_occurrence, Some(date!(2024 - 01 - 31)));
        assert_eq!(schedule.next_occurrence, Some(date!(2024 - 02 - 29)));

        let second = fire(&schedule, as_of, &TransactionSink, &connection).unwrap();
        let schedule = get_schedule(schedule.id, &connection).unwrap();

        assert_eq!(second.date, date!(2024 - 02 - 29));
        assert_eq!(schedule.last_occurrence, Some(date!(2024 - 02 - 29)));
        assert_eq!(schedule.next_occurrence, Some(date!(2024 - 03 - 31)));
    }

    #[test]
    fn fire_weekly_monday_advances_one_week() {
        let connection = get_test_connection();
        // 2024-03-04 is a Monday.
        let schedule = create_schedule(
            RecurringSchedule::build(
                rent_payload(),
                RecurrenceKind::Weekly,
                RecurrenceParams {
                    weekday: Some(DayOfWeek::new(1).unwrap()),
                    ..Default::default()
                },
            )
            .next_occurrence(Some(date!(2024 - 03 - 04))),
            date!(2024 - 03 - 04),
            &connection,
        )
        .unwrap();

        fire(&schedule, date!(2024 - 03 - 04), &RecordingSink::default(), &connection).unwrap();

        let schedule = get_schedule(schedule.id, &connection).unwrap();
        assert_eq!(schedule.next_occurrence, Some(date!(2024 - 03 - 11)));
    }

    #[test]
    fn fire_dates_artifact_to_occurrence_not_as_of() {
        let connection = get_test_connection();
        let schedule = create_monthly(15, date!(2024 - 01 - 15), &connection);
        let sink = RecordingSink::default();

        fire(&schedule, date!(2024 - 06 - 30), &sink, &connection).unwrap();

        assert_eq!(sink.dates(), vec![date!(2024 - 01 - 15)]);
    }

    #[test]
    fn fire_creates_ledger_transaction() {
        let connection = get_test_connection();
        let schedule = create_monthly(1, date!(2024 - 02 - 01), &connection);

        let transaction = fire(&schedule, date!(2024 - 02 - 01), &TransactionSink, &connection)
            .expect("Could not fire schedule");

        assert_eq!(count_transactions(&connection), Ok(1));
        assert_eq!(get_transaction(transaction.id, &connection), Ok(transaction));
    }

    #[test]
    fn fire_pending_schedule_fails_without_side_effects() {
        let connection = get_test_connection();
        let schedule = create_monthly(15, date!(2024 - 01 - 15), &connection);
        let sink = RecordingSink::default();

        let result = fire(&schedule, date!(2024 - 01 - 14), &sink, &connection);

        assert_eq!(result, Err(Error::InvalidState(ScheduleState::Pending)));
        assert!(sink.dates().is_empty());
        assert_eq!(get_schedule(schedule.id, &connection), Ok(schedule));
    }

    #[test]
    fn fire_suspended_schedule_fails() {
        let connection = get_test_connection();
        let schedule = create_monthly(15, date!(2024 - 01 - 15), &connection);
        let schedule = set_active(schedule.id, false, &connection).unwrap();

        let result = fire(
            &schedule,
            date!(2024 - 02 - 01),
            &RecordingSink::default(),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidState(ScheduleState::Suspended)));
    }

    #[test]
    fn fire_with_stale_snapshot_is_a_conflict() {
        let connection = get_test_connection();
        let stale = create_monthly(15, date!(2024 - 01 - 15), &connection);
        let sink = RecordingSink::default();
        let as_of = date!(2024 - 06 - 30);
        fire(&stale, as_of, &sink, &connection).unwrap();

        let result = fire(&stale, as_of, &sink, &connection);

        assert_eq!(result, Err(Error::ScheduleConflict(stale.id)));
        assert_eq!(sink.dates(), vec![date!(2024 - 01 - 15)]);
    }

    #[test]
    fn sink_failure_rolls_back_schedule() {
        let connection = get_test_connection();
        let schedule = create_monthly(15, date!(2024 - 01 - 15), &connection);

        let result = fire(
            &schedule,
            date!(2024 - 02 - 01),
            &FailingSink::for_name(&schedule.payload.name),
            &connection,
        );

        assert!(result.is_err());
        assert_eq!(get_schedule(schedule.id, &connection), Ok(schedule));
    }

    #[test]
    fn unknown_label_rolls_back_transaction_and_schedule() {
        let connection = get_test_connection();
        let mut payload = rent_payload();
        payload.labels = vec![999];
        let schedule = create_schedule(
            RecurringSchedule::build(payload, RecurrenceKind::Monthly, RecurrenceParams::default())
                .next_occurrence(Some(date!(2024 - 01 - 15))),
            date!(2024 - 01 - 15),
            &connection,
        )
        .unwrap();

        let result = fire(&schedule, date!(2024 - 01 - 15), &TransactionSink, &connection);

        assert_eq!(result, Err(Error::InvalidTag(Some(999))));
        assert_eq!(count_transactions(&connection), Ok(0));
        assert_eq!(get_schedule(schedule.id, &connection), Ok(schedule));
    }

    #[test]
    fn repeated_fire_strictly_increases_next_occurrence() {
        let connection = get_test_connection();
        let mut schedule = create_monthly(31, date!(2022 - 11 - 30), &connection);
        let as_of = date!(2024 - 03 - 15);
        let sink = RecordingSink::default();

        while schedule.due(as_of) {
            let before = schedule.next_occurrence;
            fire(&schedule, as_of, &sink, &connection).unwrap();
            schedule = get_schedule(schedule.id, &connection).unwrap();
            assert!(schedule.next_occurrence > before);
        }

        let fired = sink.dates();
        assert_eq!(fired.len(), 16);
        assert!(fired.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(fired.first(), Some(&date!(2022 - 11 - 30)));
        assert_eq!(fired.last(), Some(&date!(2024 - 02 - 29)));
    }

    #[test]
    fn skip_advances_without_artifact_or_last_occurrence() {
        let connection = get_test_connection();
        let schedule = create_monthly(31, date!(2024 - 01 - 31), &connection);

        let skipped = skip(&schedule, date!(2024 - 02 - 01), &connection).unwrap();

        assert_eq!(skipped.next_occurrence, Some(date!(2024 - 02 - 29)));
        assert_eq!(skipped.last_occurrence, None);
        assert_eq!(count_transactions(&connection), Ok(0));
    }

    #[test]
    fn skip_keeps_previous_last_occurrence() {
        let connection = get_test_connection();
        let schedule = create_monthly(10, date!(2024 - 01 - 10), &connection);
        let as_of = date!(2024 - 03 - 01);
        fire(&schedule, as_of, &RecordingSink::default(), &connection).unwrap();
        let schedule = get_schedule(schedule.id, &connection).unwrap();

        let skipped = skip(&schedule, as_of, &connection).unwrap();

        assert_eq!(skipped.last_occurrence, Some(date!(2024 - 01 - 10)));
        assert_eq!(skipped.next_occurrence, Some(date!(2024 - 03 - 10)));
    }

    #[test]
    fn skip_pending_schedule_fails() {
        let connection = get_test_connection();
        let schedule = create_monthly(10, date!(2024 - 01 - 10), &connection);

        let result = skip(&schedule, date!(2024 - 01 - 09), &connection);

        assert_eq!(result, Err(Error::InvalidState(ScheduleState::Pending)));
    }

    #[test]
    fn set_active_round_trip_keeps_history() {
        let connection = get_test_connection();
        let schedule = create_monthly(10, date!(2024 - 01 - 10), &connection);
        fire(&schedule, date!(2024 - 01 - 10), &RecordingSink::default(), &connection).unwrap();

        let paused = set_active(schedule.id, false, &connection).unwrap();
        let resumed = set_active(schedule.id, true, &connection).unwrap();

        assert!(!paused.active);
        assert!(resumed.active);
        assert_eq!(resumed.last_occurrence, Some(date!(2024 - 01 - 10)));
        assert_eq!(resumed.next_occurrence, Some(date!(2024 - 02 - 10)));
    }

    #[test]
    fn set_active_on_missing_schedule_fails() {
        let connection = get_test_connection();

        assert_eq!(
            set_active(3, true, &connection),
            Err(Error::UpdateMissingSchedule)
        );
    }
}
