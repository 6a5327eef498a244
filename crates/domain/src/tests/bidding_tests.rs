// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{create_test_ad_group, create_test_campaign};
use crate::{
    AdGroup, BidInputs, BiddingStrategy, Campaign, PerformanceCounters, calculate_bid,
    estimate_conversion_probability, estimate_conversion_value, resolve_effective_bid,
};

fn bid_for(
    campaign: &Campaign,
    ad_group: &AdGroup,
    counters: &PerformanceCounters,
    today_spend: Decimal,
    returning_user: bool,
) -> Option<Decimal> {
    calculate_bid(&BidInputs {
        campaign,
        ad_group,
        campaign_counters: counters,
        today_spend,
        returning_user,
    })
}

#[test]
fn test_effective_bid_prefers_ad_group_override() {
    let campaign: Campaign = create_test_campaign("c1");
    let mut ad_group: AdGroup = create_test_ad_group("g1", "c1");
    assert_eq!(resolve_effective_bid(&ad_group, &campaign), dec!(5.00));

    ad_group.default_bid = Some(dec!(3.25));
    assert_eq!(resolve_effective_bid(&ad_group, &campaign), dec!(3.25));
}

#[test]
fn test_manual_cpc_uses_effective_bid() {
    let campaign: Campaign = create_test_campaign("c1");
    let mut ad_group: AdGroup = create_test_ad_group("g1", "c1");
    ad_group.default_bid = Some(dec!(2.40));
    let counters: PerformanceCounters = PerformanceCounters::default();

    assert_eq!(
        bid_for(&campaign, &ad_group, &counters, Decimal::ZERO, false),
        Some(dec!(2.40))
    );
}

#[test]
fn test_conversion_probability_blends_history_and_caps() {
    let none: PerformanceCounters = PerformanceCounters::default();
    assert_eq!(estimate_conversion_probability(&none, false), dec!(0.01));
    assert_eq!(estimate_conversion_probability(&none, true), dec!(0.015));

    let strong: PerformanceCounters = PerformanceCounters {
        impressions: 100,
        conversions: 50,
        ..PerformanceCounters::default()
    };
    // (0.02 + 0.5) / 2 = 0.26, capped at 0.20
    assert_eq!(estimate_conversion_probability(&strong, false), dec!(0.20));
}

#[test]
fn test_auto_cpc_scales_target_cpa() {
    let mut campaign: Campaign = create_test_campaign("c1");
    campaign.bidding_strategy = BiddingStrategy::AutoCpc;
    let ad_group: AdGroup = create_test_ad_group("g1", "c1");
    let counters: PerformanceCounters = PerformanceCounters::default();

    // No target: fall back to the campaign default.
    assert_eq!(
        bid_for(&campaign, &ad_group, &counters, Decimal::ZERO, false),
        Some(dec!(5.00))
    );

    campaign.target_cpa = Some(dec!(200));
    assert_eq!(
        bid_for(&campaign, &ad_group, &counters, Decimal::ZERO, false),
        Some(dec!(2.00))
    );
    assert_eq!(
        bid_for(&campaign, &ad_group, &counters, Decimal::ZERO, true),
        Some(dec!(3.00))
    );
}

#[test]
fn test_target_roas_uses_conversion_value() {
    let mut campaign: Campaign = create_test_campaign("c1");
    campaign.bidding_strategy = BiddingStrategy::TargetRoas;
    campaign.target_roas = Some(dec!(2));
    let ad_group: AdGroup = create_test_ad_group("g1", "c1");

    let fresh: PerformanceCounters = PerformanceCounters::default();
    assert_eq!(estimate_conversion_value(&fresh), dec!(500));
    assert_eq!(
        bid_for(&campaign, &ad_group, &fresh, Decimal::ZERO, false),
        Some(dec!(10.00))
    );

    let history: PerformanceCounters = PerformanceCounters {
        conversions: 4,
        revenue: dec!(1000),
        ..PerformanceCounters::default()
    };
    assert_eq!(
        bid_for(&campaign, &ad_group, &history, Decimal::ZERO, false),
        Some(dec!(5.00))
    );
}

#[test]
fn test_maximize_clicks_spreads_remaining_budget() {
    let mut campaign: Campaign = create_test_campaign("c1");
    campaign.bidding_strategy = BiddingStrategy::MaximizeClicks;
    campaign.daily_budget = dec!(300);
    campaign.max_bid = Some(dec!(2.50));
    let ad_group: AdGroup = create_test_ad_group("g1", "c1");
    let counters: PerformanceCounters = PerformanceCounters::default();

    // 300 / 100 = 3.00, capped at the 2.50 max bid.
    assert_eq!(
        bid_for(&campaign, &ad_group, &counters, Decimal::ZERO, false),
        Some(dec!(2.50))
    );
    // (300 - 200) / 100 = 1.00
    assert_eq!(
        bid_for(&campaign, &ad_group, &counters, dec!(200), false),
        Some(dec!(1.00))
    );
    // Nothing left: the campaign does not bid.
    assert_eq!(
        bid_for(&campaign, &ad_group, &counters, dec!(300), false),
        None
    );
}

#[test]
fn test_maximize_conversions_uses_historical_cpa() {
    let mut campaign: Campaign = create_test_campaign("c1");
    campaign.bidding_strategy = BiddingStrategy::MaximizeConversions;
    let ad_group: AdGroup = create_test_ad_group("g1", "c1");

    let history: PerformanceCounters = PerformanceCounters {
        conversions: 10,
        spend: dec!(50),
        ..PerformanceCounters::default()
    };
    assert_eq!(
        bid_for(&campaign, &ad_group, &history, Decimal::ZERO, false),
        Some(dec!(6.00))
    );
    assert_eq!(
        bid_for(&campaign, &ad_group, &PerformanceCounters::default(), Decimal::ZERO, false),
        Some(dec!(5.00))
    );
}

#[test]
fn test_non_positive_bid_is_dropped() {
    let mut campaign: Campaign = create_test_campaign("c1");
    campaign.default_bid = Decimal::ZERO;
    campaign.bidding_strategy = BiddingStrategy::TargetCpa;
    let ad_group: AdGroup = create_test_ad_group("g1", "c1");

    assert_eq!(
        bid_for(&campaign, &ad_group, &PerformanceCounters::default(), Decimal::ZERO, false),
        None
    );
}

#[test]
fn test_overflowing_bid_is_dropped() {
    let ad_group: AdGroup = create_test_ad_group("g1", "c1");

    let mut roas: Campaign = create_test_campaign("c1");
    roas.bidding_strategy = BiddingStrategy::TargetRoas;
    roas.target_roas = Some(Decimal::MAX);
    assert_eq!(
        bid_for(&roas, &ad_group, &PerformanceCounters::default(), Decimal::ZERO, false),
        None
    );

    let mut conversions: Campaign = create_test_campaign("c1");
    conversions.bidding_strategy = BiddingStrategy::MaximizeConversions;
    let history: PerformanceCounters = PerformanceCounters {
        conversions: 1,
        spend: Decimal::MAX,
        ..PerformanceCounters::default()
    };
    assert_eq!(
        bid_for(&conversions, &ad_group, &history, Decimal::ZERO, false),
        None
    );

    let mut clicks: Campaign = create_test_campaign("c1");
    clicks.bidding_strategy = BiddingStrategy::MaximizeClicks;
    clicks.daily_budget = Decimal::MAX;
    assert_eq!(
        bid_for(&clicks, &ad_group, &PerformanceCounters::default(), Decimal::MIN, false),
        None
    );
}
