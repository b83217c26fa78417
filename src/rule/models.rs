use serde::{Deserialize, Serialize};

use crate::tag::TagId;

/// Database identifier for a rule.
pub type RuleId = u32;

/// A rule that automatically tags transactions whose descriptions start with a pattern.
/// Pattern matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Rule {
    /// The ID of the rule.
    pub id: RuleId,

    /// The pattern that transaction descriptions must start with (case-insensitive).
    pub pattern: String,

    /// The ID of the tag to apply when this rule matches.
    pub tag_id: TagId,
}
