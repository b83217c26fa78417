//! Tags, the labels attached to transactions (e.g., 'Groceries', 'Salary').

mod db;
mod domain;

pub use db::{create_tag, create_tag_table, get_all_tags, get_tag};
pub use domain::{Tag, TagId, TagName};
