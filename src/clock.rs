//! Sources of "today" for the scheduler.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Provides the current date.
pub trait Clock {
    /// The current date.
    fn today(&self) -> Date;
}

/// A clock that reads the system time in a named timezone.
///
/// The offset is resolved every time [Clock::today] is called so that
/// daylight saving transitions are picked up by long running processes.
#[derive(Debug, Clone)]
pub struct LocalClock {
    canonical_timezone: String,
}

impl LocalClock {
    /// Create a clock for `canonical_timezone`, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an [Error::InvalidTimezoneError] if `canonical_timezone` is not
    /// a known canonical timezone name.
    pub fn new(canonical_timezone: &str) -> Result<Self, Error> {
        match get_local_offset(canonical_timezone) {
            Some(_) => Ok(Self {
                canonical_timezone: canonical_timezone.to_owned(),
            }),
            None => Err(Error::InvalidTimezoneError(canonical_timezone.to_owned())),
        }
    }

    /// The canonical name of the timezone this clock reads the date in.
    pub fn timezone(&self) -> &str {
        &self.canonical_timezone
    }
}

impl Clock for LocalClock {
    fn today(&self) -> Date {
        let offset = get_local_offset(&self.canonical_timezone).unwrap_or_else(|| {
            tracing::warn!(
                "could not get the offset for {}, falling back to UTC",
                self.canonical_timezone
            );
            UtcOffset::UTC
        });

        OffsetDateTime::now_utc().to_offset(offset).date()
    }
}

/// A clock that is stuck on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}

fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}
