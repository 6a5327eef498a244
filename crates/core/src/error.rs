// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use adserve_domain::{CampaignId, ClockError, DomainError, PlacementId};

/// Errors raised by the serving engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A domain rule was violated.
    DomainViolation(DomainError),
    /// The catalog is internally inconsistent.
    InvalidCatalog(String),
    /// No placement with this id exists.
    PlacementNotFound(PlacementId),
    /// The placement exists but is not accepting ads.
    PlacementInactive(PlacementId),
    /// No campaign with this id exists.
    CampaignNotFound(CampaignId),
    /// No impression with this id exists.
    ImpressionNotFound(String),
    /// No click with this id exists.
    ClickNotFound(String),
    /// No conversion with this id exists.
    ConversionNotFound(String),
    /// The backing store failed.
    Storage(String),
    /// A lock guarding in-memory state was poisoned by a panicking writer.
    LockPoisoned(&'static str),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "Domain violation: {err}"),
            Self::InvalidCatalog(msg) => write!(f, "Invalid catalog: {msg}"),
            Self::PlacementNotFound(id) => write!(f, "Placement not found: {id}"),
            Self::PlacementInactive(id) => write!(f, "Placement is inactive: {id}"),
            Self::CampaignNotFound(id) => write!(f, "Campaign not found: {id}"),
            Self::ImpressionNotFound(id) => write!(f, "Impression not found: {id}"),
            Self::ClickNotFound(id) => write!(f, "Click not found: {id}"),
            Self::ConversionNotFound(id) => write!(f, "Conversion not found: {id}"),
            Self::Storage(msg) => write!(f, "Storage error: {msg}"),
            Self::LockPoisoned(what) => write!(f, "Lock poisoned: {what}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}

impl From<ClockError> for CoreError {
    fn from(err: ClockError) -> Self {
        Self::DomainViolation(DomainError::Clock(err))
    }
}
