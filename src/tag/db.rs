//! Storage for tags.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    tag::{Tag, TagId, TagName},
};

/// Insert a tag called `name`.
///
/// # Errors
/// This function will return an:
/// - [Error::DuplicateTagName] if a tag with the same name exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_tag(name: TagName, connection: &Connection) -> Result<Tag, Error> {
    connection
        .prepare("INSERT INTO tag (name) VALUES (?1) RETURNING id, name")?
        .query_row([name.as_str()], map_tag_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateTagName(name.clone()),
            error => error.into(),
        })
}

/// Look up the tag with `id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if there is no such tag,
/// or an [Error::SqlError] if there is some other SQL error.
pub fn get_tag(id: TagId, connection: &Connection) -> Result<Tag, Error> {
    let tag = connection
        .prepare("SELECT id, name FROM tag WHERE id = :id")?
        .query_one(&[(":id", &id)], map_tag_row)?;

    Ok(tag)
}

/// List every tag, sorted by name.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_all_tags(connection: &Connection) -> Result<Vec<Tag>, Error> {
    connection
        .prepare("SELECT id, name FROM tag ORDER BY name COLLATE NOCASE ASC, id ASC")?
        .query_map([], map_tag_row)?
        .map(|maybe_tag| maybe_tag.map_err(Error::from))
        .collect()
}

/// Create the tag table.
///
/// Tag names are unique. Rules and transaction tags reference the table
/// by ID.
pub fn create_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS tag (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        (),
    )?;

    Ok(())
}

fn map_tag_row(row: &Row) -> Result<Tag, rusqlite::Error> {
    let id = row.get(0)?;
    let name: String = row.get(1)?;

    Ok(Tag {
        id,
        name: TagName::new_unchecked(&name),
    })
}
