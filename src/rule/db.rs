use rusqlite::{Connection, Row};

use crate::{
    Error,
    rule::models::{Rule, RuleId},
    tag::TagId,
};

/// Create a rule in the database.
///
/// # Errors
/// This function will return an [Error::InvalidTag] if `tag_id` does not
/// refer to a valid tag, or an [Error::SqlError] if there is an SQL error.
pub fn create_rule(pattern: &str, tag_id: TagId, connection: &Connection) -> Result<Rule, Error> {
    connection
        .execute(
            "INSERT INTO rule (pattern, tag_id) VALUES (?1, ?2);",
            (pattern, tag_id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(error, Some(_))
                if error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::InvalidTag(Some(tag_id))
            }
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid() as RuleId;

    Ok(Rule {
        id,
        pattern: pattern.to_string(),
        tag_id,
    })
}

/// Retrieve all rules in the database, longest pattern first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_all_rules(connection: &Connection) -> Result<Vec<Rule>, Error> {
    connection
        // Sort by descending length to ensure that ambiguous patterns (e.g, foo, foobar)
        // always match the more specific (longer) pattern first
        .prepare("SELECT id, pattern, tag_id FROM rule ORDER BY LENGTH(pattern) DESC, id ASC;")?
        .query_map([], map_rule_row)?
        .map(|maybe_rule| maybe_rule.map_err(|error| error.into()))
        .collect()
}

/// Delete a rule from the database.
///
/// # Errors
/// This function will return an [Error::DeleteMissingRule] if the rule
/// doesn't exist, or an [Error::SqlError] if there is an SQL error.
pub fn delete_rule(rule_id: RuleId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM rule WHERE id = ?1", [rule_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRule);
    }

    Ok(())
}

/// Create the rule table and its indexes.
pub fn create_rule_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS rule (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pattern TEXT NOT NULL,
                tag_id INTEGER NOT NULL,
                FOREIGN KEY(tag_id) REFERENCES tag(id) ON UPDATE CASCADE ON DELETE CASCADE,
                UNIQUE(pattern, tag_id)
            );",
        (),
    )?;

    // Create index for foreign key to improve query performance
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_rule_tag_id ON rule(tag_id)",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('rule', 0)",
        (),
    )?;

    Ok(())
}

fn map_rule_row(row: &Row) -> Result<Rule, rusqlite::Error> {
    let id = row.get(0)?;
    let pattern = row.get(1)?;
    let tag_id = row.get(2)?;

    Ok(Rule {
        id,
        pattern,
        tag_id,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        tag::{TagName, create_tag},
        test_utils::get_test_connection,
    };

    use super::{create_rule, delete_rule, get_all_rules};

    #[test]
    fn create_rule_succeeds() {
        let connection = get_test_connection();
        let tag = create_tag(TagName::new_unchecked("Utilities"), &connection).unwrap();

        let rule = create_rule("power", tag.id, &connection).expect("Could not create rule");

        assert!(rule.id > 0);
        assert_eq!(rule.pattern, "power");
        assert_eq!(rule.tag_id, tag.id);
    }

    #[test]
    fn create_rule_with_unknown_tag_fails() {
        let connection = get_test_connection();

        let result = create_rule("power", 41, &connection);

        assert_eq!(result, Err(Error::InvalidTag(Some(41))));
    }

    #[test]
    fn get_all_rules_puts_longest_pattern_first() {
        let connection = get_test_connection();
        let tag = create_tag(TagName::new_unchecked("Subscriptions"), &connection).unwrap();
        let short = create_rule("spot", tag.id, &connection).unwrap();
        let long = create_rule("spotify family", tag.id, &connection).unwrap();

        let rules = get_all_rules(&connection).unwrap();

        assert_eq!(rules, vec![long, short]);
    }

    #[test]
    fn delete_rule_removes_rule() {
        let connection = get_test_connection();
        let tag = create_tag(TagName::new_unchecked("Transport"), &connection).unwrap();
        let rule = create_rule("bus", tag.id, &connection).unwrap();

        delete_rule(rule.id, &connection).unwrap();

        assert_eq!(get_all_rules(&connection), Ok(vec![]));
        assert_eq!(delete_rule(rule.id, &connection), Err(Error::DeleteMissingRule));
    }
}
