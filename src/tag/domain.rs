//! The tag model and its validated name.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Database identifier for a tag.
pub type TagId = i64;

/// The name of a tag, trimmed and never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Validate `name` for use as a tag name.
    ///
    /// Leading and trailing whitespace is removed first.
    ///
    /// # Errors
    ///
    /// Returns an [Error::EmptyTagName] if nothing is left after trimming.
    pub fn new(name: &str) -> Result<Self, Error> {
        match name.trim() {
            "" => Err(Error::EmptyTagName),
            trimmed => Ok(Self(trimmed.to_owned())),
        }
    }

    /// Wrap `name` without trimming or checking it.
    ///
    /// Meant for names read back from the database, which were validated on
    /// the way in.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TagName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TagName::new(&value)
    }
}

impl From<TagName> for String {
    fn from(value: TagName) -> Self {
        value.0
    }
}

impl Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// A label attached to ledger transactions, e.g. "Housing" or "Wages".
///
/// Schedules refer to tags by ID in their payload labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Tag {
    /// The ID of the tag.
    pub id: TagId,
    /// The display name of the tag.
    pub name: TagName,
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::TagName;

    #[test]
    fn new_trims_surrounding_whitespace() {
        let name = TagName::new("\tWages  ").unwrap();

        assert_eq!(name.as_str(), "Wages");
    }

    #[test]
    fn new_rejects_blank_name() {
        assert_eq!(TagName::new(""), Err(Error::EmptyTagName));
        assert_eq!(TagName::new(" \n "), Err(Error::EmptyTagName));
    }

    #[test]
    fn deserializing_validates_name() {
        let valid: Result<TagName, _> = serde_json::from_str("\" Rent \"");
        let blank: Result<TagName, _> = serde_json::from_str("\"  \"");

        assert_eq!(valid.unwrap(), TagName::new_unchecked("Rent"));
        assert!(blank.is_err());
    }

    #[test]
    fn display_pads_like_a_string() {
        let name = TagName::new_unchecked("Gym");

        assert_eq!(format!("[{name:<5}]"), "[Gym  ]");
    }
}
