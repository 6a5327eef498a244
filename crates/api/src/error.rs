// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use adserve::CoreError;
use adserve_domain::DomainError;

/// API-level errors.
///
/// These are distinct from domain/core errors and represent the API contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A domain rule was violated.
    DomainRuleViolation {
        /// The rule that was violated.
        rule: String,
        /// A human-readable description of the violation.
        message: String,
    },
    /// Invalid input was provided.
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// A requested resource was not found.
    ResourceNotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// An internal error occurred.
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainRuleViolation { rule, message } => {
                write!(f, "Domain rule violation ({rule}): {message}")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::ResourceNotFound {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} not found: {message}")
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::MissingField { field } => ApiError::InvalidInput {
            field: field.to_string(),
            message: String::from("Required field is missing or empty"),
        },
        DomainError::UnknownVariant { kind, value } => ApiError::InvalidInput {
            field: kind.to_string(),
            message: format!("Unknown value '{value}'"),
        },
        DomainError::NegativeAmount { field, value } => ApiError::InvalidInput {
            field: field.to_string(),
            message: format!("Must not be negative (got {value})"),
        },
        DomainError::AmountTooLarge { field, value, max } => ApiError::InvalidInput {
            field: field.to_string(),
            message: format!("Must not exceed {max} (got {value})"),
        },
        DomainError::InvalidQualityScore { value, max } => ApiError::InvalidInput {
            field: String::from("quality_score"),
            message: format!("Must be in (0, {max}] (got {value})"),
        },
        DomainError::InvalidScrollDepth(depth) => ApiError::InvalidInput {
            field: String::from("scroll_depth"),
            message: format!("Must be between 0 and 100 (got {depth})"),
        },
        DomainError::InvalidScheduleWindow {
            day,
            start_hour,
            end_hour,
        } => ApiError::DomainRuleViolation {
            rule: String::from("schedule_window"),
            message: format!("Invalid schedule window for {day}: {start_hour}..={end_hour}"),
        },
        DomainError::Clock(clock_err) => ApiError::Internal {
            message: format!("Serving clock error: {clock_err}"),
        },
    }
}

/// Translates a core error into an API error.
///
/// This translation is explicit and ensures core errors are not leaked directly.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::PlacementNotFound(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Placement"),
            message: format!("Placement '{id}' does not exist"),
        },
        CoreError::PlacementInactive(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Placement"),
            message: format!("Placement '{id}' is not active"),
        },
        CoreError::CampaignNotFound(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Campaign"),
            message: format!("Campaign '{id}' does not exist"),
        },
        CoreError::ImpressionNotFound(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Impression"),
            message: format!("Impression '{id}' does not exist"),
        },
        CoreError::ClickNotFound(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Click"),
            message: format!("Click '{id}' does not exist"),
        },
        CoreError::ConversionNotFound(id) => ApiError::ResourceNotFound {
            resource_type: String::from("Conversion"),
            message: format!("Conversion '{id}' does not exist"),
        },
        CoreError::InvalidCatalog(msg) => ApiError::Internal {
            message: format!("Invalid catalog: {msg}"),
        },
        CoreError::Storage(msg) => ApiError::Internal {
            message: format!("Storage error: {msg}"),
        },
        CoreError::LockPoisoned(what) => ApiError::Internal {
            message: format!("Lock poisoned: {what}"),
        },
    }
}
