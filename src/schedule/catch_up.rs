//! The batch pass that fires every schedule that is due.

use std::time::Instant;

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    clock::Clock,
    database_id::ScheduleId,
    schedule::{
        db::{get_due_schedules, get_schedule},
        runner::{ArtifactSink, fire},
    },
};

/// How many occurrences of a schedule a single catch-up pass fires.
///
/// A schedule that is several periods behind moves forward by one
/// occurrence per pass, so repeated passes are needed to fully catch up.
/// This bounds the number of artifacts a single pass can create.
pub const OCCURRENCES_PER_PASS: usize = 1;

/// The outcome of a catch-up pass.
#[derive(Debug, PartialEq)]
pub struct CatchUpReport<A> {
    /// The artifacts created, in the order the schedules were fired.
    pub fired: Vec<A>,
    /// Schedules that could not be fired and why.
    pub failed: Vec<(ScheduleId, Error)>,
    /// Schedules that another caller changed during the pass. They are
    /// picked up again by the next pass if they are still due.
    pub deferred: Vec<ScheduleId>,
}

impl<A> CatchUpReport<A> {
    /// Creates a report where nothing happened.
    pub fn empty() -> Self {
        Self {
            fired: Vec::new(),
            failed: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// Whether every due schedule was fired.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.deferred.is_empty()
    }
}

/// Fire each active schedule that is due as of `as_of`, oldest occurrence first.
///
/// Each schedule is fired [OCCURRENCES_PER_PASS] time(s) at most, even if it
/// has fallen several periods behind. A failure to fire one schedule does
/// not stop the others from being fired, the error is recorded in the report
/// instead.
///
/// # Errors
/// Returns an error only if the due schedules could not be read from the
/// database.
pub fn run_due<S: ArtifactSink>(
    as_of: Date,
    sink: &S,
    connection: &Connection,
) -> Result<CatchUpReport<S::Artifact>, Error> {
    let start_time = Instant::now();
    let due_schedules = get_due_schedules(as_of, connection)?;

    if due_schedules.is_empty() {
        tracing::debug!("no schedules are due as of {as_of}");
        return Ok(CatchUpReport::empty());
    }

    let mut report = CatchUpReport::empty();

    for schedule in due_schedules {
        let id = schedule.id;
        let mut snapshot = schedule;

        for fired_count in 1..=OCCURRENCES_PER_PASS {
            match fire(&snapshot, as_of, sink, connection) {
                Ok(artifact) => report.fired.push(artifact),
                Err(Error::ScheduleConflict(_)) => {
                    tracing::warn!(
                        "schedule {id} was changed by another caller, leaving it for the next pass"
                    );
                    report.deferred.push(id);
                    break;
                }
                Err(error) => {
                    tracing::error!("could not fire schedule {id}: {error}");
                    report.failed.push((id, error));
                    break;
                }
            }

            if fired_count == OCCURRENCES_PER_PASS {
                break;
            }

            snapshot = match get_schedule(id, connection) {
                Ok(next) if next.due(as_of) => next,
                Ok(_) => break,
                Err(error) => {
                    tracing::error!("could not reload schedule {id}: {error}");
                    report.failed.push((id, error));
                    break;
                }
            };
        }
    }

    tracing::info!(
        "catch-up as of {as_of} completed in {}ms: {} fired, {} failed, {} deferred",
        start_time.elapsed().as_millis(),
        report.fired.len(),
        report.failed.len(),
        report.deferred.len()
    );

    Ok(report)
}

/// Run a catch-up pass for today's date according to `clock`.
///
/// # Errors
/// Returns an error only if the due schedules could not be read from the
/// database.
pub fn catch_up<S: ArtifactSink>(
    clock: &impl Clock,
    sink: &S,
    connection: &Connection,
) -> Result<CatchUpReport<S::Artifact>, Error> {
    run_due(clock.today(), sink, connection)
}
