//! Sets up the application's SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    rule::create_rule_table,
    schedule::create_schedule_table,
    tag::create_tag_table,
    transaction::{create_transaction_table, create_transaction_tag_table},
};

/// Create the tables for the domain models if they do not already exist.
///
/// Foreign key enforcement is switched on for `connection`, which the
/// artifact sink relies on to reject unknown tags.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_tag_table(&transaction)?;
    create_rule_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_transaction_tag_table(&transaction)?;
    create_schedule_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
