// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Domain types and pure serving rules.
//!
//! Nothing in this crate performs I/O or holds shared state. Every rule that
//! decides whether a campaign bids, what it bids, which creative it enters and
//! whether a click is billable is a pure function here, so the auction engine
//! and the tracking paths can be tested without a ledger or a database.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod bidding;
mod clock;
mod context;
mod creative_selection;
mod error;
mod fraud;
mod targeting;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use bidding::{
    BASE_CONVERSION_RATE, BidInputs, DEFAULT_CONVERSION_VALUE, ESTIMATED_REMAINING_OPPORTUNITIES,
    MAX_CONVERSION_PROBABILITY, MAXIMIZE_CONVERSIONS_UPLIFT, RETURNING_USER_MULTIPLIER,
    calculate_bid, estimate_conversion_probability, estimate_conversion_value,
    resolve_effective_bid,
};
pub use clock::{ClockError, DEFAULT_SERVING_TIMEZONE, LocalSlot, ServingClock};
pub use context::{
    ClickContext, ClickPosition, DeviceContext, GeoLocation, PageContext, RequestContext,
    UserContext,
};
pub use creative_selection::{
    CreativeCandidate, CreativeScorer, CtrBoostedScorer, DEFAULT_QUALITY_SCORE,
    effective_quality_score, is_servable, select_best_creative,
};
pub use error::DomainError;
pub use fraud::{
    FraudAssessment, FraudSignal, INVALID_CLICK_THRESHOLD, MAX_CLICKS_PER_IP,
    MIN_USER_AGENT_LENGTH, score_click,
};
pub use targeting::{
    EligibilityInput, Ineligibility, check_eligibility, demographics_match, is_eligible,
    matches_any_keyword,
};
pub use types::{
    AdGroup, AdGroupId, AdGroupStatus, BiddingStrategy, Campaign, CampaignId, CampaignStatus,
    CampaignType, ConversionType, Creative, CreativeId, CreativeStatus, CreativeType, DayOfWeek,
    HourWindow, OrganizationId, PerformanceCounters, Placement, PlacementId, PricingModel,
    Targeting,
};
pub use validation::{
    MAX_BID_AMOUNT, MAX_BUDGET_AMOUNT, MAX_QUALITY_SCORE, MAX_TARGET_CPA, MAX_TARGET_ROAS,
    validate_amount, validate_auction_context, validate_campaign, validate_campaign_schedule,
    validate_non_negative, validate_quality_score, validate_viewability,
};
