//! Ledger transactions, the artifacts produced by recurring schedules.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing and querying transactions and their tags
//! - The `TransactionSink` that records fired schedules in the ledger

mod core;
mod sink;

pub use core::{
    Transaction, TransactionBuilder, count_transactions, create_transaction,
    create_transaction_table, create_transaction_tag_table, get_transaction, get_transactions,
};
pub use sink::{TransactionSink, get_transactions_after_catch_up};
