//! Recurrence rules and the calculation of the next occurrence.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::Error;

// ============================================================================
// MODELS
// ============================================================================

/// How often a recurring schedule happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    /// Once per calendar month, on [RecurrenceParams::day_of_month].
    Monthly,
    /// Once per week, on [RecurrenceParams::weekday].
    Weekly,
    /// Once per year, on [RecurrenceParams::day_of_month] of
    /// [RecurrenceParams::month_of_year].
    Yearly,
}

impl RecurrenceKind {
    /// The name used when storing the kind in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceKind::Monthly => "monthly",
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Yearly => "yearly",
        }
    }
}

impl Display for RecurrenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecurrenceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(RecurrenceKind::Monthly),
            "weekly" => Ok(RecurrenceKind::Weekly),
            "yearly" => Ok(RecurrenceKind::Yearly),
            _ => Err(Error::InvalidRecurrenceKind(s.to_owned())),
        }
    }
}

impl ToSql for RecurrenceKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RecurrenceKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A day of the month from 1 to 31.
///
/// Days that do not exist in a given month (e.g., the 31st of April) are
/// clipped to the last day of that month when computing occurrences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfMonth(u8);

impl DayOfMonth {
    /// Create a day of the month.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidDayOfMonth] if `day` is not in 1-31.
    pub fn new(day: u8) -> Result<Self, Error> {
        if (1..=31).contains(&day) {
            Ok(Self(day))
        } else {
            Err(Error::InvalidDayOfMonth(day))
        }
    }

    /// Create a day of the month without validation.
    ///
    /// The caller should ensure that `day` is in 1-31.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the range invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(day: u8) -> Self {
        Self(day)
    }

    /// The day as a number.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DayOfMonth {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DayOfMonth::new(value)
    }
}

impl From<DayOfMonth> for u8 {
    fn from(value: DayOfMonth) -> Self {
        value.0
    }
}

/// A day of the week from 0 (Sunday) to 6 (Saturday).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    /// Create a day of the week, counting from Sunday as 0.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidWeekday] if `day` is not in 0-6.
    pub fn new(day: u8) -> Result<Self, Error> {
        if day <= 6 {
            Ok(Self(day))
        } else {
            Err(Error::InvalidWeekday(day))
        }
    }

    /// Create a day of the week without validation.
    ///
    /// The caller should ensure that `day` is in 0-6.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the range invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(day: u8) -> Self {
        Self(day)
    }

    /// The day as a number where Sunday is 0.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DayOfWeek::new(value)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(value: DayOfWeek) -> Self {
        value.0
    }
}

impl From<time::Weekday> for DayOfWeek {
    fn from(value: time::Weekday) -> Self {
        Self(value.number_days_from_sunday())
    }
}

/// A month of the year from 1 (January) to 12 (December).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MonthOfYear(u8);

impl MonthOfYear {
    /// Create a month of the year.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidMonthOfYear] if `month` is not in 1-12.
    pub fn new(month: u8) -> Result<Self, Error> {
        if (1..=12).contains(&month) {
            Ok(Self(month))
        } else {
            Err(Error::InvalidMonthOfYear(month))
        }
    }

    /// Create a month of the year without validation.
    ///
    /// The caller should ensure that `month` is in 1-12.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the range invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(month: u8) -> Self {
        Self(month)
    }

    /// The month as a number where January is 1.
    pub fn get(self) -> u8 {
        self.0
    }

    fn as_month(self) -> Month {
        Month::try_from(self.0).unwrap_or(Month::December)
    }
}

impl TryFrom<u8> for MonthOfYear {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MonthOfYear::new(value)
    }
}

impl From<MonthOfYear> for u8 {
    fn from(value: MonthOfYear) -> Self {
        value.0
    }
}

impl From<Month> for MonthOfYear {
    fn from(value: Month) -> Self {
        Self(value as u8)
    }
}

/// The optional parameters of a recurrence rule.
///
/// A parameter that is `None` takes the value of the corresponding field of
/// the reference date given to [compute_next].
/// Parameters that are not relevant to a kind are ignored, e.g. `weekday`
/// for a monthly schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecurrenceParams {
    /// Used by [RecurrenceKind::Monthly] and [RecurrenceKind::Yearly].
    pub day_of_month: Option<DayOfMonth>,
    /// Used by [RecurrenceKind::Weekly].
    pub weekday: Option<DayOfWeek>,
    /// Used by [RecurrenceKind::Yearly].
    pub month_of_year: Option<MonthOfYear>,
}

impl RecurrenceParams {
    /// Create validated parameters from raw numbers.
    ///
    /// # Errors
    /// Returns an [Error::InvalidDayOfMonth], [Error::InvalidWeekday] or
    /// [Error::InvalidMonthOfYear] for the first parameter that is out of range.
    pub fn new(
        day_of_month: Option<u8>,
        weekday: Option<u8>,
        month_of_year: Option<u8>,
    ) -> Result<Self, Error> {
        Ok(Self {
            day_of_month: day_of_month.map(DayOfMonth::new).transpose()?,
            weekday: weekday.map(DayOfWeek::new).transpose()?,
            month_of_year: month_of_year.map(MonthOfYear::new).transpose()?,
        })
    }

    /// Whether any parameter used by `kind` is missing.
    pub fn is_missing_any_for(&self, kind: RecurrenceKind) -> bool {
        match kind {
            RecurrenceKind::Monthly => self.day_of_month.is_none(),
            RecurrenceKind::Weekly => self.weekday.is_none(),
            RecurrenceKind::Yearly => self.day_of_month.is_none() || self.month_of_year.is_none(),
        }
    }
}

// ============================================================================
// CALCULATION
// ============================================================================

/// Compute the first occurrence of the rule `kind` + `params` that falls on
/// or after `from`.
///
/// Days past the end of a month are clipped to the last day of that month,
/// e.g. the 31st in a 30 day month lands on the 30th, and the 29th of
/// February lands on the 28th in non-leap years. A weekly rule whose weekday
/// matches `from` returns `from` itself.
///
/// Results that would fall after [Date::MAX] are saturated to [Date::MAX].
pub fn compute_next(kind: RecurrenceKind, params: &RecurrenceParams, from: Date) -> Date {
    try_compute_next(kind, params, from).unwrap_or(Date::MAX)
}

/// Like [compute_next], but returns `None` instead of saturating when the
/// occurrence would fall after [Date::MAX].
pub(crate) fn try_compute_next(
    kind: RecurrenceKind,
    params: &RecurrenceParams,
    from: Date,
) -> Option<Date> {
    match kind {
        RecurrenceKind::Monthly => next_monthly(params, from),
        RecurrenceKind::Weekly => next_weekly(params, from),
        RecurrenceKind::Yearly => next_yearly(params, from),
    }
}

fn next_monthly(params: &RecurrenceParams, from: Date) -> Option<Date> {
    let target = params
        .day_of_month
        .map_or(from.day(), |day_of_month| day_of_month.get());

    if from.day() <= target {
        return clipped_date(from.year(), from.month(), target);
    }

    match from.month() {
        Month::December => clipped_date(from.year() + 1, Month::January, target),
        month => clipped_date(from.year(), month.next(), target),
    }
}

fn next_weekly(params: &RecurrenceParams, from: Date) -> Option<Date> {
    let current = DayOfWeek::from(from.weekday()).get();
    let target = params
        .weekday
        .map_or(current, |weekday| weekday.get() % 7);
    let days_ahead = (7 + target - current) % 7;

    from.checked_add(Duration::days(days_ahead.into()))
}

fn next_yearly(params: &RecurrenceParams, from: Date) -> Option<Date> {
    let month = params
        .month_of_year
        .map_or(from.month(), |month_of_year| month_of_year.as_month());
    let day = params
        .day_of_month
        .map_or(from.day(), |day_of_month| day_of_month.get());

    match clipped_date(from.year(), month, day) {
        Some(candidate) if candidate >= from => Some(candidate),
        _ => clipped_date(from.year() + 1, month, day),
    }
}

/// Build a date, clipping `day` to the length of the month.
///
/// Returns `None` for years outside of the supported range.
fn clipped_date(year: i32, month: Month, day: u8) -> Option<Date> {
    let day = day.clamp(1, time::util::days_in_month(month, year));

    Date::from_calendar_date(year, month, day).ok()
}

// ============================================================================
// TESTS
// ============================================================================
