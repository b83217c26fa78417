//! Database operations for recurring schedules.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef},
};
use time::Date;

use crate::{
    Error,
    database_id::ScheduleId,
    schedule::{
        core::{
            Direction, RecurringSchedule, ScheduleBuilder, SchedulePayload, ScheduleUpdate,
        },
        recurrence::{DayOfMonth, DayOfWeek, MonthOfYear, RecurrenceParams, compute_next},
    },
};

/// Create a schedule in the database.
///
/// If the builder has no next occurrence, the first occurrence on or after
/// `today` is used.
///
/// # Errors
/// This function will return an:
/// - [Error::JSONSerializationError] if the payload labels cannot be encoded,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_schedule(
    builder: ScheduleBuilder,
    today: Date,
    connection: &Connection,
) -> Result<RecurringSchedule, Error> {
    if builder.params.is_missing_any_for(builder.kind) {
        tracing::warn!(
            "creating a {} schedule \"{}\" without all of its parameters, missing parameters follow the date of each occurrence",
            builder.kind,
            builder.payload.name
        );
    }

    let next_occurrence = builder
        .next_occurrence
        .unwrap_or_else(|| compute_next(builder.kind, &builder.params, today));
    let labels = serde_json::to_string(&builder.payload.labels)?;

    let schedule = connection
        .prepare(
            "INSERT INTO recurring_schedule
                (name, amount, direction, labels, kind, day_of_month, weekday, month_of_year, next_occurrence, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING id, name, amount, direction, labels, kind, day_of_month, weekday,
                month_of_year, next_occurrence, last_occurrence, active, version",
        )?
        .query_row(
            rusqlite::params![
                builder.payload.name,
                builder.payload.amount,
                builder.payload.direction,
                labels,
                builder.kind,
                builder.params.day_of_month.map(DayOfMonth::get),
                builder.params.weekday.map(DayOfWeek::get),
                builder.params.month_of_year.map(MonthOfYear::get),
                next_occurrence,
                builder.active,
            ],
            map_schedule_row,
        )?;

    tracing::info!(
        "created {} schedule {} \"{}\", next occurrence {}",
        schedule.kind,
        schedule.id,
        schedule.payload.name,
        next_occurrence
    );

    Ok(schedule)
}

/// Retrieve a schedule from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid schedule,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_schedule(id: ScheduleId, connection: &Connection) -> Result<RecurringSchedule, Error> {
    let schedule = connection
        .prepare(
            "SELECT id, name, amount, direction, labels, kind, day_of_month, weekday,
                month_of_year, next_occurrence, last_occurrence, active, version
             FROM recurring_schedule WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_schedule_row)?;

    Ok(schedule)
}

/// Retrieve all schedules, active or not, ordered by ID.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_all_schedules(connection: &Connection) -> Result<Vec<RecurringSchedule>, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, direction, labels, kind, day_of_month, weekday,
                month_of_year, next_occurrence, last_occurrence, active, version
             FROM recurring_schedule ORDER BY id ASC",
        )?
        .query_map([], map_schedule_row)?
        .map(|maybe_schedule| maybe_schedule.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the active schedules whose next occurrence is on or before `as_of`.
///
/// Schedules are ordered by next occurrence, oldest first, and then by ID so
/// that the order is stable for schedules due on the same day.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_due_schedules(
    as_of: Date,
    connection: &Connection,
) -> Result<Vec<RecurringSchedule>, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, direction, labels, kind, day_of_month, weekday,
                month_of_year, next_occurrence, last_occurrence, active, version
             FROM recurring_schedule
             WHERE active = 1 AND next_occurrence IS NOT NULL AND next_occurrence <= :as_of
             ORDER BY next_occurrence ASC, id ASC",
        )?
        .query_map(&[(":as_of", &as_of)], map_schedule_row)?
        .map(|maybe_schedule| maybe_schedule.map_err(|error| error.into()))
        .collect()
}

/// Replace the payload and recurrence parameters of a schedule.
///
/// The occurrence dates, active flag and recurrence kind are left untouched.
///
/// # Errors
/// This function will return an:
/// - [Error::UpdateMissingSchedule] if `id` does not refer to a valid schedule,
/// - [Error::JSONSerializationError] if the payload labels cannot be encoded,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_schedule(
    id: ScheduleId,
    update: ScheduleUpdate,
    connection: &Connection,
) -> Result<RecurringSchedule, Error> {
    let labels = serde_json::to_string(&update.payload.labels)?;

    connection
        .prepare(
            "UPDATE recurring_schedule
             SET name = ?1, amount = ?2, direction = ?3, labels = ?4,
                day_of_month = ?5, weekday = ?6, month_of_year = ?7, version = version + 1
             WHERE id = ?8
             RETURNING id, name, amount, direction, labels, kind, day_of_month, weekday,
                month_of_year, next_occurrence, last_occurrence, active, version",
        )?
        .query_row(
            rusqlite::params![
                update.payload.name,
                update.payload.amount,
                update.payload.direction,
                labels,
                update.params.day_of_month.map(DayOfMonth::get),
                update.params.weekday.map(DayOfWeek::get),
                update.params.month_of_year.map(MonthOfYear::get),
                id,
            ],
            map_schedule_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingSchedule,
            error => error.into(),
        })
}

/// Delete a schedule by ID.
///
/// Transactions that the schedule already created are kept.
///
/// # Errors
/// This function will return an [Error::DeleteMissingSchedule] if the
/// schedule doesn't exist, or an [Error::SqlError] if there is an SQL error.
pub fn delete_schedule(id: ScheduleId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM recurring_schedule WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingSchedule);
    }

    Ok(())
}

/// Set the active flag of a schedule, leaving everything else as is.
pub(super) fn update_active(
    id: ScheduleId,
    active: bool,
    connection: &Connection,
) -> Result<RecurringSchedule, Error> {
    connection
        .prepare(
            "UPDATE recurring_schedule SET active = ?1, version = version + 1
             WHERE id = ?2
             RETURNING id, name, amount, direction, labels, kind, day_of_month, weekday,
                month_of_year, next_occurrence, last_occurrence, active, version",
        )?
        .query_row((active, id), map_schedule_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingSchedule,
            error => error.into(),
        })
}

/// Write the occurrence dates of `schedule` if the stored row is still at
/// `schedule.version`.
///
/// # Errors
/// Returns an [Error::ScheduleConflict] if the row was changed or removed
/// since it was read, or an [Error::SqlError] if there is an SQL error.
pub(super) fn save_occurrences(
    schedule: &RecurringSchedule,
    connection: &Connection,
) -> Result<RecurringSchedule, Error> {
    connection
        .prepare(
            "UPDATE recurring_schedule
             SET next_occurrence = ?1, last_occurrence = ?2, version = version + 1
             WHERE id = ?3 AND version = ?4
             RETURNING id, name, amount, direction, labels, kind, day_of_month, weekday,
                month_of_year, next_occurrence, last_occurrence, active, version",
        )?
        .query_row(
            (
                schedule.next_occurrence,
                schedule.last_occurrence,
                schedule.id,
                schedule.version,
            ),
            map_schedule_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::ScheduleConflict(schedule.id),
            error => error.into(),
        })
}

/// Create the recurring schedule table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_schedule_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS recurring_schedule (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            direction TEXT NOT NULL CHECK (direction IN ('credit', 'debit')),
            labels TEXT NOT NULL DEFAULT '[]',
            kind TEXT NOT NULL CHECK (kind IN ('monthly', 'weekly', 'yearly')),
            day_of_month INTEGER CHECK (day_of_month BETWEEN 1 AND 31),
            weekday INTEGER CHECK (weekday BETWEEN 0 AND 6),
            month_of_year INTEGER CHECK (month_of_year BETWEEN 1 AND 12),
            next_occurrence TEXT,
            last_occurrence TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            version INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_recurring_schedule_due
            ON recurring_schedule(active, next_occurrence);

        CREATE TRIGGER IF NOT EXISTS recurring_schedule_kind_is_fixed
            BEFORE UPDATE OF kind ON recurring_schedule
            WHEN NEW.kind IS NOT OLD.kind
        BEGIN
            SELECT RAISE(ABORT, 'the recurrence kind of a schedule cannot be changed');
        END;",
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('recurring_schedule', 0)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [RecurringSchedule].
fn map_schedule_row(row: &Row) -> Result<RecurringSchedule, rusqlite::Error> {
    let raw_labels: String = row.get(4)?;
    let labels = serde_json::from_str(&raw_labels).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error))
    })?;

    let day_of_month: Option<u8> = row.get(6)?;
    let weekday: Option<u8> = row.get(7)?;
    let month_of_year: Option<u8> = row.get(8)?;

    Ok(RecurringSchedule {
        id: row.get(0)?,
        payload: SchedulePayload {
            name: row.get(1)?,
            amount: row.get(2)?,
            direction: row.get(3)?,
            labels,
        },
        kind: row.get(5)?,
        params: RecurrenceParams {
            day_of_month: day_of_month.map(DayOfMonth::new_unchecked),
            weekday: weekday.map(DayOfWeek::new_unchecked),
            month_of_year: month_of_year.map(MonthOfYear::new_unchecked),
        },
        next_occurrence: row.get(9)?,
        last_occurrence: row.get(10)?,
        active: row.get(11)?,
        version: row.get(12)?,
    })
}

impl ToSql for Direction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let name = match self {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        };

        Ok(ToSqlOutput::from(name))
    }
}

impl FromSql for Direction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            other => Err(FromSqlError::Other(
                format!("{other} is not a valid direction").into(),
            )),
        }
    }
}
