// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::sync::Arc;

use adserve_domain::{
    AdGroup, AdGroupId, AdGroupStatus, BiddingStrategy, Campaign, CampaignId, CampaignStatus,
    CampaignType, ConversionType, Creative, CreativeId, CreativeStatus, CreativeType, CtrBoostedScorer,
    DeviceContext, OrganizationId, PageContext, PerformanceCounters, Placement, PlacementId,
    PricingModel, ServingClock, Targeting, UserContext,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::{
    AuctionEngine, AuctionOutcome, AuctionRequest, Catalog, CatalogData, ClickRecord,
    ConversionRecord, ImpressionRecord, MetricsAggregator, Stores,
};

/// Monday 2026-03-02 10:00 UTC (15:30 in Asia/Kolkata).
pub fn create_test_now() -> OffsetDateTime {
    datetime!(2026-03-02 10:00 UTC)
}

pub fn create_test_campaign(id: &str, default_bid: Decimal) -> Campaign {
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
        default_bid,
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

pub fn create_test_creative(id: &str, ad_group_id: &str, quality_score: Decimal) -> Creative {
    Creative {
        id: CreativeId::new(id),
        ad_group_id: AdGroupId::new(ad_group_id),
        name: format!("Creative {id}"),
        creative_type: CreativeType::Image,
        status: CreativeStatus::Active,
        quality_score: Some(quality_score),
        headline: Some(String::from("Fresh groceries")),
        description: None,
        image_url: Some(format!("https://cdn.example/{id}.png")),
        destination_url: format!("https://shop.example/{id}"),
        counters: PerformanceCounters::default(),
    }
}

pub fn create_test_placement(pricing_model: PricingModel) -> Placement {
    Placement {
        id: PlacementId::new("home-banner"),
        organization_id: OrganizationId::new("org-1"),
        name: String::from("Home banner"),
        supported_formats: vec![CreativeType::Image, CreativeType::Text],
        minimum_bid: dec!(0.10),
        pricing_model,
        base_cpc: Some(dec!(1.00)),
        base_cpm: None,
        is_active: true,
    }
}

/// Campaign A bids 5.00 with quality 8.0; campaign B bids 4.00 with quality 9.0.
pub fn create_test_catalog_data(pricing_model: PricingModel) -> CatalogData {
    CatalogData {
        campaigns: vec![
            create_test_campaign("camp-a", dec!(5.00)),
            create_test_campaign("camp-b", dec!(4.00)),
        ],
        ad_groups: vec![
            create_test_ad_group("ag-a", "camp-a"),
            create_test_ad_group("ag-b", "camp-b"),
        ],
        creatives: vec![
            create_test_creative("cr-a", "ag-a", dec!(8.0)),
            create_test_creative("cr-b", "ag-b", dec!(9.0)),
        ],
        placements: vec![create_test_placement(pricing_model)],
    }
}

pub fn create_test_request(request_id: &str) -> AuctionRequest {
    AuctionRequest {
        request_id: String::from(request_id),
        placement_id: PlacementId::new("home-banner"),
        user: UserContext {
            session_id: String::from("session-1"),
            device_type: String::from("mobile"),
            ..UserContext::default()
        },
        page: PageContext {
            page_url: String::from("https://shop.example/"),
            ..PageContext::default()
        },
        device: DeviceContext {
            user_agent: Some(String::from("Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0")),
            ip_address: Some(String::from("203.0.113.7")),
            browser: Some(String::from("firefox")),
            os: Some(String::from("linux")),
        },
        now: create_test_now(),
    }
}

pub struct TestEngine {
    pub catalog: Arc<Catalog>,
    pub stores: Stores,
    pub engine: AuctionEngine,
    pub metrics: MetricsAggregator,
}

pub fn create_test_engine(data: CatalogData) -> TestEngine {
    let catalog: Arc<Catalog> = Arc::new(Catalog::new(data).unwrap());
    let stores: Stores = Stores::in_memory();
    catalog.seed_counters(stores.counters.as_ref()).unwrap();
    let engine: AuctionEngine = AuctionEngine::new(
        Arc::clone(&catalog),
        Arc::clone(&stores.ledger),
        Arc::clone(&stores.counters),
        Arc::clone(&stores.events),
        Arc::new(CtrBoostedScorer),
        ServingClock::default(),
    );
    let metrics: MetricsAggregator = MetricsAggregator::new(
        Arc::clone(&catalog),
        Arc::clone(&stores.counters),
        Arc::clone(&stores.ledger),
    );
    TestEngine {
        catalog,
        stores,
        engine,
        metrics,
    }
}

/// Runs an auction that must serve an ad and returns the impression.
pub fn serve_test_impression(test: &TestEngine, request_id: &str) -> ImpressionRecord {
    match test.engine.run(&create_test_request(request_id)).unwrap() {
        AuctionOutcome::Recorded(recorded) => recorded.impression.unwrap(),
        AuctionOutcome::NoBids => panic!("expected a served ad"),
    }
}

pub fn create_test_click_for(impression: &ImpressionRecord, is_valid: bool) -> ClickRecord {
    ClickRecord {
        click_id: format!("click-{}", impression.impression_id),
        impression_id: impression.impression_id.clone(),
        campaign_id: impression.campaign_id.clone(),
        ad_group_id: impression.ad_group_id.clone(),
        creative_id: impression.creative_id.clone(),
        ip_address: impression.ip_address.clone(),
        user_agent: impression.user_agent.clone(),
        destination_url: String::from("https://shop.example/landing"),
        click_position: None,
        time_to_click: dec!(2.5),
        is_valid,
        fraud_score: Decimal::ZERO,
        fraud_reason: String::new(),
        cost: Decimal::ZERO,
        clicked_at: impression.served_at + time::Duration::seconds(3),
    }
}

pub fn create_test_conversion_for(
    click: &ClickRecord,
    value: Decimal,
    is_verified: bool,
) -> ConversionRecord {
    ConversionRecord {
        conversion_id: format!("conv-{}", click.click_id),
        click_id: click.click_id.clone(),
        campaign_id: click.campaign_id.clone(),
        ad_group_id: click.ad_group_id.clone(),
        creative_id: click.creative_id.clone(),
        conversion_type: ConversionType::Purchase,
        conversion_value: value,
        currency: String::from("INR"),
        order_id: None,
        transaction_id: None,
        attribution_model: String::from("last_click"),
        verification_method: None,
        is_verified,
        custom_data: serde_json::Value::Null,
        converted_at: click.clicked_at + time::Duration::minutes(5),
    }
}
