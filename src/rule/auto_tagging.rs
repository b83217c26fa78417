use crate::{rule::models::Rule, tag::TagId};

/// Find the tag of the first rule in `rules` that matches `description`.
///
/// Rules should be ordered from most to least specific, as returned by
/// [get_all_rules](crate::get_all_rules), so that a description matching
/// both "foo" and "foobar" gets the tag of "foobar".
pub fn matching_tag_id(description: &str, rules: &[Rule]) -> Option<TagId> {
    rules
        .iter()
        .find(|rule| matches_rule_pattern(description, &rule.pattern))
        .map(|rule| rule.tag_id)
}

/// Check if a transaction description starts with a rule pattern (case-insensitive).
#[inline]
fn matches_rule_pattern(description: &str, pattern: &str) -> bool {
    description
        .to_lowercase()
        .starts_with(&pattern.to_lowercase())
}
