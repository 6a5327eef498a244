// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Bid calculation per bidding strategy.
//!
//! ## Strategies
//!
//! - `manual_cpc`: the effective bid (ad group override, else campaign default)
//! - `auto_cpc`: `target_cpa × estimated conversion probability`
//! - `target_roas`: `estimated conversion value × target_roas / 100`
//! - `maximize_clicks`: remaining daily budget spread over a fixed number of
//!   opportunities, capped at the max bid
//! - `maximize_conversions`: historical CPA with a 20% uplift
//! - `target_cpa` and any strategy missing its target: campaign default bid
//!
//! A non-positive result means the campaign does not bid. That is not an error.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{AdGroup, BiddingStrategy, Campaign, PerformanceCounters};

/// Base conversion rate blended with the campaign's history (2%).
pub const BASE_CONVERSION_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

/// Probability multiplier for returning users.
pub const RETURNING_USER_MULTIPLIER: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Ceiling on the estimated conversion probability (20%).
pub const MAX_CONVERSION_PROBABILITY: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Conversion value assumed before a campaign has any conversions.
pub const DEFAULT_CONVERSION_VALUE: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Placeholder for the number of auctions left in the day.
pub const ESTIMATED_REMAINING_OPPORTUNITIES: Decimal = Decimal::ONE_HUNDRED;

/// Uplift applied to historical CPA when maximizing conversions.
pub const MAXIMIZE_CONVERSIONS_UPLIFT: Decimal = Decimal::from_parts(12, 0, 0, false, 1);

/// Bids are quoted in currency units with two decimal places.
const BID_SCALE: u32 = 2;

/// Inputs to a single bid computation.
#[derive(Debug, Clone, Copy)]
pub struct BidInputs<'a> {
    pub campaign: &'a Campaign,
    pub ad_group: &'a AdGroup,
    /// Live cumulative counters for the campaign.
    pub campaign_counters: &'a PerformanceCounters,
    /// Spend already charged to today's ledger entry.
    pub today_spend: Decimal,
    pub returning_user: bool,
}

/// Resolves the manual bid for an ad group: its own override if set,
/// otherwise the campaign default.
#[must_use]
pub fn resolve_effective_bid(ad_group: &AdGroup, campaign: &Campaign) -> Decimal {
    ad_group.default_bid.unwrap_or(campaign.default_bid)
}

/// Estimates the probability that a click converts.
///
/// The 2% base rate is averaged with the historical conversions/impressions
/// ratio (0 when there are no impressions), boosted 1.5× for returning users
/// and capped at 20%.
#[must_use]
pub fn estimate_conversion_probability(
    counters: &PerformanceCounters,
    returning_user: bool,
) -> Decimal {
    let historical_rate: Decimal = if counters.impressions > 0 {
        Decimal::from(counters.conversions) / Decimal::from(counters.impressions)
    } else {
        Decimal::ZERO
    };

    let mut probability: Decimal = (BASE_CONVERSION_RATE + historical_rate) / Decimal::TWO;
    if returning_user {
        probability *= RETURNING_USER_MULTIPLIER;
    }
    probability.min(MAX_CONVERSION_PROBABILITY)
}

/// Estimates the value of a conversion: historical revenue per conversion,
/// or [`DEFAULT_CONVERSION_VALUE`] before the first conversion.
#[must_use]
pub fn estimate_conversion_value(counters: &PerformanceCounters) -> Decimal {
    if counters.conversions > 0 {
        counters.revenue / Decimal::from(counters.conversions)
    } else {
        DEFAULT_CONVERSION_VALUE
    }
}

/// Computes the bid for a campaign.
///
/// # Returns
///
/// `Some(bid)` rounded to two decimal places, or `None` if the strategy
/// produced a bid that is not strictly positive or does not fit in a
/// `Decimal`.
#[must_use]
pub fn calculate_bid(inputs: &BidInputs<'_>) -> Option<Decimal> {
    let campaign: &Campaign = inputs.campaign;
    let counters: &PerformanceCounters = inputs.campaign_counters;

    let raw_bid: Decimal = match campaign.bidding_strategy {
        BiddingStrategy::ManualCpc => resolve_effective_bid(inputs.ad_group, campaign),
        BiddingStrategy::AutoCpc => match campaign.target_cpa {
            Some(cpa) => cpa.checked_mul(estimate_conversion_probability(
                counters,
                inputs.returning_user,
            ))?,
            None => campaign.default_bid,
        },
        BiddingStrategy::TargetRoas => match campaign.target_roas {
            Some(roas) => estimate_conversion_value(counters)
                .checked_mul(roas.checked_div(Decimal::ONE_HUNDRED)?)?,
            None => campaign.default_bid,
        },
        BiddingStrategy::MaximizeClicks => {
            let remaining: Decimal = campaign
                .daily_budget
                .checked_sub(inputs.today_spend)?
                .max(Decimal::ZERO);
            let ceiling: Decimal = campaign.max_bid.unwrap_or(campaign.default_bid);
            remaining
                .checked_div(ESTIMATED_REMAINING_OPPORTUNITIES)?
                .min(ceiling)
        }
        BiddingStrategy::MaximizeConversions => {
            if counters.conversions > 0 {
                counters
                    .spend
                    .checked_div(Decimal::from(counters.conversions))?
                    .checked_mul(MAXIMIZE_CONVERSIONS_UPLIFT)?
            } else {
                campaign.default_bid
            }
        }
        BiddingStrategy::TargetCpa => campaign.default_bid,
    };

    let bid: Decimal =
        raw_bid.round_dp_with_strategy(BID_SCALE, RoundingStrategy::MidpointAwayFromZero);
    (bid > Decimal::ZERO).then_some(bid)
}
