//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// Database identifier for a ledger transaction.
pub type TransactionId = DatabaseId;

/// Database identifier for a recurring schedule.
pub type ScheduleId = DatabaseId;
