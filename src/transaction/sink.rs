//! Turns fired schedules into ledger transactions.

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    clock::Clock,
    rule::{get_all_rules, matching_tag_id},
    schedule::{ArtifactSink, Direction, SchedulePayload, catch_up},
    transaction::core::{Transaction, create_transaction, get_transactions},
};

/// An [ArtifactSink] that records each fired occurrence as a [Transaction].
///
/// The transaction amount is negative for debits and positive for credits,
/// and the payload's name becomes the description. The payload's labels are
/// attached as tags, along with the tag of the auto-tagging rule that
/// matches the description, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionSink;

impl ArtifactSink for TransactionSink {
    type Artifact = Transaction;

    fn create(
        &self,
        payload: &SchedulePayload,
        effective_date: Date,
        connection: &Connection,
    ) -> Result<Transaction, Error> {
        let amount = match payload.direction {
            Direction::Credit => payload.amount.abs(),
            Direction::Debit => -payload.amount.abs(),
        };

        let rules = get_all_rules(connection)?;
        let mut tag_ids = payload.labels.clone();
        if let Some(tag_id) = matching_tag_id(&payload.name, &rules) {
            tag_ids.push(tag_id);
        }

        let transaction = create_transaction(
            Transaction::build(amount, effective_date, &payload.name).tag_ids(tag_ids),
            connection,
        )?;

        tracing::debug!(
            "created transaction {} for {} on {}",
            transaction.id,
            payload.name,
            effective_date
        );

        Ok(transaction)
    }
}

/// Get all transactions after bringing recurring schedules up to date.
///
/// One catch-up pass is run for today's date first so that the listing
/// includes any recurring transactions that have become due. Failures to
/// fire individual schedules are logged and do not prevent the listing.
///
/// # Errors
/// Returns an error if the due schedules or the transactions could not be
/// read from the database.
pub fn get_transactions_after_catch_up(
    clock: &impl Clock,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let report = catch_up(clock, &TransactionSink, connection)?;

    for (schedule_id, error) in &report.failed {
        tracing::warn!("schedule {schedule_id} was not brought up to date: {error}");
    }

    get_transactions(connection)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        clock::FixedClock,
        rule::create_rule,
        schedule::{
            ArtifactSink, DayOfMonth, Direction, RecurrenceKind, RecurrenceParams,
            RecurringSchedule, SchedulePayload, create_schedule, get_schedule,
        },
        tag::{TagName, create_tag},
        test_utils::{get_test_connection, rent_payload},
        transaction::count_transactions,
    };

    use super::{TransactionSink, get_transactions_after_catch_up};

    #[test]
    fn debit_is_recorded_as_negative_amount() {
        let connection = get_test_connection();

        let transaction = TransactionSink
            .create(&rent_payload(), date!(2024 - 01 - 31), &connection)
            .unwrap();

        assert_eq!(transaction.amount, -450.0);
        assert_eq!(transaction.date, date!(2024 - 01 - 31));
        assert_eq!(transaction.description, "Rent");
    }

    #[test]
    fn credit_is_recorded_as_positive_amount() {
        let connection = get_test_connection();
        let payload = SchedulePayload {
            name: "Wages".to_owned(),
            amount: 2100.0,
            direction: Direction::Credit,
            labels: vec![],
        };

        let transaction = TransactionSink
            .create(&payload, date!(2024 - 01 - 25), &connection)
            .unwrap();

        assert_eq!(transaction.amount, 2100.0);
    }

    #[test]
    fn labels_and_rule_tags_are_attached() {
        let connection = get_test_connection();
        let housing = create_tag(TagName::new_unchecked("Housing"), &connection).unwrap();
        let rent = create_tag(TagName::new_unchecked("Rent"), &connection).unwrap();
        create_rule("rent", rent.id, &connection).unwrap();
        let payload = SchedulePayload {
            labels: vec![housing.id],
            ..rent_payload()
        };

        let transaction = TransactionSink
            .create(&payload, date!(2024 - 01 - 31), &connection)
            .unwrap();

        assert_eq!(transaction.tag_ids, vec![housing.id, rent.id]);
    }

    #[test]
    fn listing_transactions_fires_due_schedules_first() {
        let connection = get_test_connection();
        let schedule = create_schedule(
            RecurringSchedule::build(
                rent_payload(),
                RecurrenceKind::Monthly,
                RecurrenceParams {
                    day_of_month: Some(DayOfMonth::new(1).unwrap()),
                    ..Default::default()
                },
            ),
            date!(2024 - 05 - 01),
            &connection,
        )
        .unwrap();

        let transactions =
            get_transactions_after_catch_up(&FixedClock(date!(2024 - 05 - 02)), &connection)
                .unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].date, date!(2024 - 05 - 01));
        assert_eq!(
            get_schedule(schedule.id, &connection).unwrap().next_occurrence,
            Some(date!(2024 - 06 - 01))
        );
    }

    #[test]
    fn listing_transactions_without_due_schedules_creates_nothing() {
        let connection = get_test_connection();

        let transactions =
            get_transactions_after_catch_up(&FixedClock(date!(2024 - 05 - 02)), &connection)
                .unwrap();

        assert!(transactions.is_empty());
        assert_eq!(count_transactions(&connection), Ok(0));
    }
}
