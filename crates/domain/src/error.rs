// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use rust_decimal::Decimal;

use crate::clock::ClockError;

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required request field is missing or empty.
    MissingField {
        /// The name of the missing field.
        field: &'static str,
    },
    /// A textual value does not name a known variant.
    UnknownVariant {
        /// The enumeration being parsed (e.g., `conversion_type`).
        kind: &'static str,
        /// The rejected value.
        value: String,
    },
    /// A monetary or numeric amount must not be negative.
    NegativeAmount {
        /// The field that carried the amount.
        field: &'static str,
        /// The rejected amount.
        value: Decimal,
    },
    /// A catalog amount is larger than the field allows.
    AmountTooLarge {
        /// The field that carried the amount.
        field: &'static str,
        /// The rejected amount.
        value: Decimal,
        /// The largest accepted amount.
        max: Decimal,
    },
    /// A quality score must be positive and at most `max`.
    InvalidQualityScore {
        /// The rejected score.
        value: Decimal,
        /// The largest accepted score.
        max: Decimal,
    },
    /// Scroll depth must be a percentage in `0..=100`.
    InvalidScrollDepth(Decimal),
    /// A schedule window has an hour outside `0..=23` or ends before it starts.
    InvalidScheduleWindow {
        /// The day the window belongs to.
        day: String,
        /// The configured start hour.
        start_hour: u8,
        /// The configured end hour.
        end_hour: u8,
    },
    /// The serving clock could not resolve a local time.
    Clock(ClockError),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "Required field '{field}' is missing"),
            Self::UnknownVariant { kind, value } => {
                write!(f, "Unknown {kind}: '{value}'")
            }
            Self::NegativeAmount { field, value } => {
                write!(f, "Field '{field}' must not be negative (got {value})")
            }
            Self::AmountTooLarge { field, value, max } => {
                write!(f, "Field '{field}' must not exceed {max} (got {value})")
            }
            Self::InvalidQualityScore { value, max } => {
                write!(f, "Quality score must be in (0, {max}] (got {value})")
            }
            Self::InvalidScrollDepth(depth) => {
                write!(f, "Scroll depth must be between 0 and 100 (got {depth})")
            }
            Self::InvalidScheduleWindow {
                day,
                start_hour,
                end_hour,
            } => write!(
                f,
                "Invalid schedule window for {day}: {start_hour}..={end_hour}"
            ),
            Self::Clock(err) => write!(f, "Clock error: {err}"),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<ClockError> for DomainError {
    fn from(err: ClockError) -> Self {
        Self::Clock(err)
    }
}
