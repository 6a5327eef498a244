// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Serving-day clock.
//!
//! Budget days and schedule targeting are evaluated as wall-clock values in a
//! single declared timezone, not in UTC. This module converts a UTC instant into
//! the local calendar date (the budget ledger key) and the local weekday/hour
//! (the schedule targeting slot).
//!
//! ## Invariants
//!
//! - Instants are stored and compared in UTC
//! - Only the conversion for "which day is it" and "which hour is it" is local
//! - DST transitions shift the local hour but never the ordering of instants

use chrono::{Datelike, Timelike, Weekday};
use chrono_tz::Tz;
use time::{Date, Month, OffsetDateTime};

use crate::types::DayOfWeek;

/// Timezone the source platform served in.
pub const DEFAULT_SERVING_TIMEZONE: &str = "Asia/Kolkata";

/// Errors raised while resolving local serving time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The configured timezone is not a known IANA name.
    #[error("invalid timezone '{0}'")]
    InvalidTimezone(String),
    /// The instant cannot be represented in the local calendar.
    #[error("instant out of range: {0}")]
    OutOfRange(String),
}

/// The local weekday and hour a request falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSlot {
    /// Local day of week.
    pub weekday: DayOfWeek,
    /// Local hour of day (`0..=23`).
    pub hour: u8,
}

/// Converts UTC instants into serving-local dates and schedule slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServingClock {
    tz: Tz,
}

impl ServingClock {
    /// Creates a clock for the given IANA timezone name.
    ///
    /// # Errors
    ///
    /// Returns `ClockError::InvalidTimezone` if the name is not recognized.
    pub fn new(timezone: &str) -> Result<Self, ClockError> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ClockError::InvalidTimezone(timezone.to_string()))?;
        Ok(Self { tz })
    }

    /// A clock whose serving day is the UTC day.
    #[must_use]
    pub const fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Returns the configured timezone name.
    #[must_use]
    pub fn timezone(&self) -> &'static str {
        self.tz.name()
    }

    /// Returns the local calendar date of `now`, used as the ledger day.
    ///
    /// # Errors
    ///
    /// Returns an error if the instant is outside chrono's supported range.
    pub fn local_date(&self, now: OffsetDateTime) -> Result<Date, ClockError> {
        let local = self.to_local(now)?;
        let month_number: u8 = u8::try_from(local.month())
            .map_err(|_| ClockError::OutOfRange(format!("month {}", local.month())))?;
        let month: Month = Month::try_from(month_number)
            .map_err(|e| ClockError::OutOfRange(format!("month {month_number}: {e}")))?;
        let day: u8 = u8::try_from(local.day())
            .map_err(|_| ClockError::OutOfRange(format!("day {}", local.day())))?;

        Date::from_calendar_date(local.year(), month, day)
            .map_err(|e| ClockError::OutOfRange(e.to_string()))
    }

    /// Returns the local weekday and hour of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instant is outside chrono's supported range.
    pub fn local_slot(&self, now: OffsetDateTime) -> Result<LocalSlot, ClockError> {
        let local = self.to_local(now)?;
        let hour: u8 = u8::try_from(local.hour())
            .map_err(|_| ClockError::OutOfRange(format!("hour {}", local.hour())))?;

        Ok(LocalSlot {
            weekday: DayOfWeek::from(local.weekday()),
            hour,
        })
    }

    fn to_local(&self, now: OffsetDateTime) -> Result<chrono::DateTime<Tz>, ClockError> {
        let utc = chrono::DateTime::from_timestamp(now.unix_timestamp(), now.nanosecond())
            .ok_or_else(|| ClockError::OutOfRange(now.to_string()))?;
        Ok(utc.with_timezone(&self.tz))
    }
}

impl Default for ServingClock {
    fn default() -> Self {
        Self { tz: Tz::Asia__Kolkata }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}
