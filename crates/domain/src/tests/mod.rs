// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod bidding_tests;

use rust_decimal_macros::dec;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::{
    AdGroup, AdGroupId, AdGroupStatus, BiddingStrategy, Campaign, CampaignId, CampaignStatus,
    CampaignType, Creative, CreativeId, CreativeStatus, CreativeType, OrganizationId,
    PageContext, PerformanceCounters, Placement, PlacementId, PricingModel, RequestContext,
    ServingClock, Targeting, UserContext,
};

/// Monday 2026-03-02 10:00 UTC (15:30 in Asia/Kolkata).
pub fn create_test_now() -> OffsetDateTime {
    datetime!(2026-03-02 10:00 UTC)
}

pub fn create_test_campaign(id: &str) -> Campaign {
    Campaign {
        id: CampaignId::new(id),
        organization_id: OrganizationId::new("org-1"),
        name: format!("Campaign {id}"),
        campaign_type: CampaignType::Display,
        status: CampaignStatus::Active,
        bidding_strategy: BiddingStrategy::ManualCpc,
        start_date: datetime!(2026-01-01 00:00 UTC),
        end_date: None,
        daily_budget: dec!(100.00),
        total_budget: None,
        default_bid: dec!(5.00),
        max_bid: None,
        target_cpa: None,
        target_roas: None,
        targeting: Targeting::default(),
        auto_pause_low_performance: true,
        counters: PerformanceCounters::default(),
    }
}

pub fn create_test_ad_group(id: &str, campaign_id: &str) -> AdGroup {
    AdGroup {
        id: AdGroupId::new(id),
        campaign_id: CampaignId::new(campaign_id),
        name: format!("Ad group {id}"),
        status: AdGroupStatus::Active,
        default_bid: None,
        counters: PerformanceCounters::default(),
    }
}

pub fn create_test_creative(id: &str, ad_group_id: &str) -> Creative {
    Creative {
        id: CreativeId::new(id),
        ad_group_id: AdGroupId::new(ad_group_id),
        name: format!("Creative {id}"),
        creative_type: CreativeType::Image,
        status: CreativeStatus::Active,
        quality_score: None,
        headline: Some(String::from("Fresh groceries")),
        description: None,
        image_url: None,
        destination_url: String::from("https://shop.example/landing"),
        counters: PerformanceCounters::default(),
    }
}

pub fn create_test_placement() -> Placement {
    Placement {
        id: PlacementId::new("home-banner"),
        organization_id: OrganizationId::new("org-1"),
        name: String::from("Home banner"),
        supported_formats: vec![CreativeType::Image, CreativeType::Text],
        minimum_bid: dec!(0.10),
        pricing_model: PricingModel::Cpc,
        base_cpc: None,
        base_cpm: None,
        is_active: true,
    }
}

pub fn create_test_user_context() -> UserContext {
    UserContext {
        session_id: String::from("session-1"),
        device_type: String::from("mobile"),
        ..UserContext::default()
    }
}

pub fn create_test_page_context() -> PageContext {
    PageContext {
        page_url: String::from("https://shop.example/"),
        ..PageContext::default()
    }
}

pub fn create_test_request_context() -> RequestContext {
    RequestContext::from_contexts(
        &create_test_user_context(),
        &create_test_page_context(),
        create_test_now(),
        &ServingClock::default(),
    )
    .expect("valid request context")
}
