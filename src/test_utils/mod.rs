//! Shared helpers for unit tests.

use std::cell::RefCell;

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    db::initialize,
    schedule::{ArtifactSink, Direction, SchedulePayload},
};

/// An in-memory database with all tables created.
pub fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().unwrap();
    initialize(&connection).unwrap();
    connection
}

/// A monthly rent payment of 450.
pub fn rent_payload() -> SchedulePayload {
    SchedulePayload {
        name: "Rent".to_owned(),
        amount: 450.0,
        direction: Direction::Debit,
        labels: vec![],
    }
}

/// A sink that remembers what it was asked to create and returns the
/// effective date as the artifact.
#[derive(Debug, Default)]
pub struct RecordingSink {
    created: RefCell<Vec<(String, Date)>>,
}

impl RecordingSink {
    /// The effective dates of the created artifacts, in creation order.
    pub fn dates(&self) -> Vec<Date> {
        self.created.borrow().iter().map(|(_, date)| *date).collect()
    }

    /// The payload names of the created artifacts, in creation order.
    pub fn names(&self) -> Vec<String> {
        self.created
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl ArtifactSink for RecordingSink {
    type Artifact = Date;

    fn create(
        &self,
        payload: &SchedulePayload,
        effective_date: Date,
        _connection: &Connection,
    ) -> Result<Date, Error> {
        self.created
            .borrow_mut()
            .push((payload.name.clone(), effective_date));

        Ok(effective_date)
    }
}

/// A sink that rejects payloads with a given name and otherwise behaves like
/// [RecordingSink].
#[derive(Debug, Default)]
pub struct FailingSink {
    rejected_name: String,
    inner: RecordingSink,
}

impl FailingSink {
    pub fn for_name(name: &str) -> Self {
        Self {
            rejected_name: name.to_owned(),
            inner: RecordingSink::default(),
        }
    }
}

impl ArtifactSink for FailingSink {
    type Artifact = Date;

    fn create(
        &self,
        payload: &SchedulePayload,
        effective_date: Date,
        connection: &Connection,
    ) -> Result<Date, Error> {
        if payload.name == self.rejected_name {
            return Err(Error::InvalidTag(None));
        }

        self.inner.create(payload, effective_date, connection)
    }
}
