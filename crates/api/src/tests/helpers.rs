// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use std::sync::Arc;

use adserve::{Catalog, CatalogData, CounterScope, LedgerEntry, Stores};
use adserve_domain::{
    AdGroup, AdGroupId, AdGroupStatus, BiddingStrategy, Campaign, CampaignId, CampaignStatus,
    CampaignType, ClickPosition, Creative, CreativeId, CreativeStatus, CreativeType,
    DeviceContext, OrganizationId, PageContext, PerformanceCounters, Placement, PlacementId,
    PricingModel, Targeting, UserContext,
};
use adserve_persistence::{Persistence, SharedPersistence};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::macros::{date, datetime};
use time::{Date, OffsetDateTime};

use crate::{
    AdServer, AuctionApiRequest, AuctionApiResponse, ServingConfig, TrackClickRequest,
    TrackConversionRequest,
};

/// The Kolkata serving day of [`create_test_now`].
pub const TODAY: Date = date!(2026 - 03 - 02);

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

fn create_test_ad_group(id: &str, campaign_id: &str) -> AdGroup {
    AdGroup {
        id: AdGroupId::new(id),
        campaign_id: CampaignId::new(campaign_id),
        name: format!("Ad group {id}"),
        status: AdGroupStatus::Active,
        default_bid: None,
        counters: PerformanceCounters::default(),
    }
}

fn create_test_creative(id: &str, ad_group_id: &str, quality_score: Decimal) -> Creative {
    Creative {
        id: CreativeId::new(id),
        ad_group_id: AdGroupId::new(ad_group_id),
        name: format!("Creative {id}"),
        creative_type: CreativeType::Image,
        status: CreativeStatus::Active,
        quality_score: Some(quality_score),
        headline: Some(format!("Headline {id}")),
        description: None,
        image_url: Some(format!("https://cdn.example/{id}.png")),
        destination_url: format!("https://shop.example/{id}"),
        counters: PerformanceCounters::default(),
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
        placements: vec![Placement {
            id: PlacementId::new("home-banner"),
            organization_id: OrganizationId::new("org-1"),
            name: String::from("Home banner"),
            supported_formats: vec![CreativeType::Image],
            minimum_bid: dec!(0.10),
            pricing_model,
            base_cpc: Some(dec!(1.00)),
            base_cpm: None,
            is_active: true,
        }],
    }
}

pub struct TestServer {
    pub server: AdServer,
    pub stores: Stores,
}

impl TestServer {
    pub fn campaign_counters(&self, campaign_id: &str) -> PerformanceCounters {
        self.stores
            .counters
            .counters(&CounterScope::Campaign(CampaignId::new(campaign_id)))
            .unwrap()
    }

    pub fn ledger_entry(&self, campaign_id: &str) -> Option<LedgerEntry> {
        self.stores
            .ledger
            .entry(&CampaignId::new(campaign_id), TODAY)
            .unwrap()
    }

    pub fn spend(&self, campaign_id: &str) -> Decimal {
        self.stores
            .ledger
            .spend(&CampaignId::new(campaign_id), TODAY)
            .unwrap()
    }
}

pub fn create_test_server_with(data: CatalogData, stores: Stores) -> TestServer {
    let catalog: Catalog = Catalog::new(data).unwrap();
    let server: AdServer = AdServer::new(catalog, &stores, ServingConfig::default()).unwrap();
    TestServer { server, stores }
}

pub fn create_test_server(pricing_model: PricingModel) -> TestServer {
    create_test_server_with(create_test_catalog_data(pricing_model), Stores::in_memory())
}

/// A server whose stores are one in-memory `SQLite` database.
pub fn create_test_persistent_server(pricing_model: PricingModel) -> TestServer {
    let persistence: Persistence = Persistence::new_in_memory().unwrap();
    let shared: Arc<SharedPersistence> = Arc::new(SharedPersistence::new(persistence));
    create_test_server_with(
        create_test_catalog_data(pricing_model),
        Stores::shared(&shared),
    )
}

pub fn create_test_auction_request(request_id: Option<&str>) -> AuctionApiRequest {
    AuctionApiRequest {
        placement_id: String::from("home-banner"),
        request_id: request_id.map(String::from),
        user_context: UserContext {
            session_id: String::from("session-1"),
            device_type: String::from("mobile"),
            ..UserContext::default()
        },
        page_context: PageContext {
            page_url: String::from("https://shop.example/"),
            ..PageContext::default()
        },
        device_context: DeviceContext {
            user_agent: Some(String::from("Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0")),
            ip_address: Some(String::from("203.0.113.7")),
            browser: Some(String::from("firefox")),
            os: Some(String::from("linux")),
        },
    }
}

/// Runs an auction that must serve an ad.
pub fn serve_test_ad(test: &TestServer, request_id: &str) -> AuctionApiResponse {
    test.server
        .auction(create_test_auction_request(Some(request_id)), create_test_now())
        .unwrap()
        .served()
        .expect("expected a served ad")
}

/// A click that passes every fraud check.
pub fn create_test_click_request(impression_id: &str) -> TrackClickRequest {
    TrackClickRequest {
        impression_id: impression_id.to_string(),
        click_position: Some(ClickPosition { x: 120, y: 48 }),
        time_to_click: dec!(2.5),
        destination_url: None,
    }
}

pub fn create_test_conversion_request(
    click_id: &str,
    value: Option<Decimal>,
) -> TrackConversionRequest {
    TrackConversionRequest {
        click_id: click_id.to_string(),
        conversion_type: String::from("purchase"),
        conversion_value: value,
        order_id: None,
        transaction_id: None,
        attribution_model: None,
        verification_method: None,
        is_verified: true,
        custom_data: serde_json::Value::Null,
    }
}
