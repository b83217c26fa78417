//! Rules that tag transactions automatically based on their description.
//!
//! A rule matches descriptions that start with its pattern, ignoring case,
//! and applies its tag. Rules are applied by the
//! [TransactionSink](crate::TransactionSink) to every transaction a
//! schedule creates, on top of the schedule's own labels.

mod auto_tagging;
mod db;
mod models;

pub use auto_tagging::matching_tag_id;
pub use db::{create_rule, create_rule_table, delete_rule, get_all_rules};
pub use models::{Rule, RuleId};
