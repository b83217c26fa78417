//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{DatabaseId, TransactionId},
    tag::TagId,
};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseId,
    /// The amount of money spent (negative) or earned (positive) in this transaction.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The tags attached to the transaction, in ascending ID order.
    pub tag_ids: Vec<TagId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, description: &str) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            description: description.to_owned(),
            tag_ids: Vec::new(),
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// let builder = Transaction::build(-45.99, date!(2025-01-15), "Phone bill").tag_ids(vec![3]);
/// let transaction = create_transaction(builder, &connection)?;
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction.
    ///
    /// Positive values represent income/credits, negative values represent
    /// expenses/debits.
    pub amount: f64,

    /// The date when the transaction occurred.
    ///
    /// For transactions created by a schedule this is the occurrence date,
    /// not the date the schedule was fired.
    pub date: Date,

    /// A human-readable description of the transaction.
    pub description: String,

    /// The tags to attach to the transaction. Duplicates are ignored.
    pub tag_ids: Vec<TagId>,
}

impl TransactionBuilder {
    /// Set the tags for the transaction.
    pub fn tag_ids(mut self, tag_ids: Vec<TagId>) -> Self {
        self.tag_ids = tag_ids;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// **Note**: The transaction row and its tags are written with separate
/// statements. If you want all or nothing, pass in a SQL transaction for
/// `connection`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTag] if one of the tag IDs does not refer to a real tag,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let mut tag_ids = builder.tag_ids;
    tag_ids.sort_unstable();
    tag_ids.dedup();

    let (id, amount, date, description) = connection
        .prepare(
            "INSERT INTO \"transaction\" (amount, date, description)
             VALUES (?1, ?2, ?3)
             RETURNING id, amount, date, description",
        )?
        .query_row(
            (builder.amount, builder.date, builder.description),
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

    let mut statement =
        connection.prepare("INSERT INTO transaction_tag (transaction_id, tag_id) VALUES (?1, ?2)")?;

    for tag_id in &tag_ids {
        statement
            .execute((id, tag_id))
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error {
                        code: _,
                        extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                    },
                    _,
                ) => Error::InvalidTag(Some(*tag_id)),
                error => error.into(),
            })?;
    }

    Ok(Transaction {
        id,
        amount,
        date,
        description,
        tag_ids,
    })
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare("SELECT id, amount, date, description FROM \"transaction\" WHERE id = :id")?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    with_tags(transaction, connection)
}

/// Retrieve all transactions ordered by date, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare("SELECT id, amount, date, description FROM \"transaction\" ORDER BY date ASC, id ASC")?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| {
            maybe_transaction
                .map_err(Error::from)
                .and_then(|transaction| with_tags(transaction, connection))
        })
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
        (),
    )?;

    Ok(())
}

/// Create the transaction_tag junction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transaction_tag (
            transaction_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(tag_id) REFERENCES tag(id) ON UPDATE CASCADE ON DELETE CASCADE,
            PRIMARY KEY(transaction_id, tag_id)
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_tag_tag_id ON transaction_tag(tag_id);",
    )?;

    Ok(())
}

/// Map a database row to a Transaction without its tags.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let date = row.get(2)?;
    let description = row.get(3)?;

    Ok(Transaction {
        id,
        amount,
        date,
        description,
        tag_ids: Vec::new(),
    })
}

fn with_tags(mut transaction: Transaction, connection: &Connection) -> Result<Transaction, Error> {
    transaction.tag_ids = connection
        .prepare(
            "SELECT tag_id FROM transaction_tag WHERE transaction_id = ?1 ORDER BY tag_id ASC",
        )?
        .query_map([transaction.id], |row| row.get(0))?
        .collect::<Result<Vec<TagId>, _>>()?;

    Ok(transaction)
}

// ============================================================================
// TESTS
// ============================================================================
