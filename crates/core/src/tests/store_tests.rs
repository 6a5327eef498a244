// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use adserve_audit::{AuctionRecord, ContextSnapshot};
use adserve_domain::{AdGroupId, CampaignId, ConversionType, CreativeId, PlacementId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::Duration;

use crate::tests::helpers::create_test_now;
use crate::{
    ClickRecord, ConversionRecord, CoreError, EventStore, ImpressionRecord, InMemoryEventStore,
    InsertOutcome, ViewabilityUpdate, VoidedEvents,
};

fn create_test_record(request_id: &str) -> AuctionRecord {
    AuctionRecord {
        auction_id: format!("auction-{request_id}"),
        request_id: String::from(request_id),
        placement_id: PlacementId::new("home-banner"),
        context: ContextSnapshot::new(String::from("{}")),
        eligible_campaign_ids: vec![CampaignId::new("camp-a")],
        participating_bids: Vec::new(),
        winner: None,
        duration_micros: 12,
        auction_time: create_test_now(),
    }
}

fn create_test_impression(impression_id: &str, auction_id: &str) -> ImpressionRecord {
    ImpressionRecord {
        impression_id: String::from(impression_id),
        auction_id: Some(String::from(auction_id)),
        request_id: None,
        campaign_id: CampaignId::new("camp-a"),
        ad_group_id: AdGroupId::new("ag-a"),
        creative_id: CreativeId::new("cr-a"),
        placement_id: PlacementId::new("home-banner"),
        session_id: String::from("session-1"),
        user_agent: None,
        ip_address: Some(String::from("203.0.113.7")),
        page_url: String::from("https://shop.example/"),
        referrer_url: None,
        country: None,
        region: None,
        city: None,
        device_type: String::from("mobile"),
        browser: None,
        os: None,
        bid_amount: dec!(5.00),
        cost: dec!(4.51),
        billed_amount: Decimal::ZERO,
        viewable: false,
        view_duration_ms: 0,
        scroll_depth: None,
        served_at: create_test_now(),
    }
}

fn create_test_click(click_id: &str, impression_id: &str) -> ClickRecord {
    ClickRecord {
        click_id: String::from(click_id),
        impression_id: String::from(impression_id),
        campaign_id: CampaignId::new("camp-a"),
        ad_group_id: AdGroupId::new("ag-a"),
        creative_id: CreativeId::new("cr-a"),
        ip_address: Some(String::from("203.0.113.7")),
        user_agent: None,
        destination_url: String::from("https://shop.example/cr-a"),
        click_position: None,
        time_to_click: dec!(3.2),
        is_valid: true,
        fraud_score: Decimal::ZERO,
        fraud_reason: String::new(),
        cost: Decimal::ZERO,
        clicked_at: create_test_now() + Duration::seconds(3),
    }
}

fn create_test_conversion(conversion_id: &str, order_id: Option<&str>) -> ConversionRecord {
    ConversionRecord {
        conversion_id: String::from(conversion_id),
        click_id: String::from("click-1"),
        campaign_id: CampaignId::new("camp-a"),
        ad_group_id: AdGroupId::new("ag-a"),
        creative_id: CreativeId::new("cr-a"),
        conversion_type: ConversionType::Purchase,
        conversion_value: dec!(250.00),
        currency: String::from("INR"),
        order_id: order_id.map(String::from),
        transaction_id: None,
        attribution_model: String::from("last_click"),
        verification_method: None,
        is_verified: true,
        custom_data: serde_json::Value::Null,
        converted_at: create_test_now() + Duration::minutes(10),
    }
}

fn create_test_store_with_click() -> InMemoryEventStore {
    let store: InMemoryEventStore = InMemoryEventStore::new();
    let record: AuctionRecord = create_test_record("req-1");
    store
        .insert_auction(&record, Some(&create_test_impression("imp-1", &record.auction_id)))
        .unwrap();
    store
        .insert_click(&create_test_click("click-1", "imp-1"))
        .unwrap();
    store
}

#[test]
fn test_insert_auction_is_idempotent_on_request_id() {
    let store: InMemoryEventStore = InMemoryEventStore::new();
    let first: AuctionRecord = create_test_record("req-1");
    let mut second: AuctionRecord = create_test_record("req-1");
    second.auction_id = String::from("auction-other");

    assert!(store.insert_auction(&first, None).unwrap().is_created());
    let outcome: InsertOutcome<AuctionRecord> = store.insert_auction(&second, None).unwrap();

    assert_eq!(outcome, InsertOutcome::Existing(first.clone()));
    assert_eq!(store.auction_by_request_id("req-1").unwrap(), Some(first));
}

#[test]
fn test_impression_written_with_auction() {
    let store: InMemoryEventStore = InMemoryEventStore::new();
    let record: AuctionRecord = create_test_record("req-1");
    let impression: ImpressionRecord = create_test_impression("imp-1", &record.auction_id);

    store.insert_auction(&record, Some(&impression)).unwrap();

    assert_eq!(
        store.impression_for_auction(&record.auction_id).unwrap(),
        Some(impression)
    );
}

#[test]
fn test_update_viewability_unknown_impression() {
    let store: InMemoryEventStore = InMemoryEventStore::new();
    let update: ViewabilityUpdate = ViewabilityUpdate {
        viewable: true,
        view_duration_ms: 1500,
        scroll_depth: Some(dec!(60)),
    };

    assert!(store.update_viewability("missing", &update).unwrap().is_none());
}

#[test]
fn test_click_requires_impression() {
    let store: InMemoryEventStore = InMemoryEventStore::new();

    let result: Result<InsertOutcome<ClickRecord>, CoreError> =
        store.insert_click(&create_test_click("click-1", "missing"));

    assert!(matches!(result, Err(CoreError::ImpressionNotFound(_))));
    assert!(store.click("click-1").unwrap().is_none());
}

#[test]
fn test_second_click_on_impression_returns_first() {
    let store: InMemoryEventStore = create_test_store_with_click();

    let outcome: InsertOutcome<ClickRecord> = store
        .insert_click(&create_test_click("click-2", "imp-1"))
        .unwrap();

    assert!(!outcome.is_created());
    assert_eq!(outcome.into_inner().click_id, "click-1");
}

#[test]
fn test_count_clicks_from_ip_respects_window() {
    let store: InMemoryEventStore = create_test_store_with_click();

    let recent: u32 = store
        .count_clicks_from_ip_since("203.0.113.7", create_test_now())
        .unwrap();
    let later: u32 = store
        .count_clicks_from_ip_since("203.0.113.7", create_test_now() + Duration::hours(1))
        .unwrap();

    assert_eq!(recent, 1);
    assert_eq!(later, 0);
}

#[test]
fn test_conversion_dedupes_on_order_id() {
    let store: InMemoryEventStore = create_test_store_with_click();

    assert!(
        store
            .insert_conversion(&create_test_conversion("conv-1", Some("order-9")))
            .unwrap()
            .is_created()
    );
    let duplicate: InsertOutcome<ConversionRecord> = store
        .insert_conversion(&create_test_conversion("conv-2", Some("order-9")))
        .unwrap();

    assert_eq!(duplicate.into_inner().conversion_id, "conv-1");
}

#[test]
fn test_conversion_without_key_is_never_deduped() {
    let store: InMemoryEventStore = create_test_store_with_click();

    assert!(
        store
            .insert_conversion(&create_test_conversion("conv-1", None))
            .unwrap()
            .is_created()
    );
    assert!(
        store
            .insert_conversion(&create_test_conversion("conv-2", None))
            .unwrap()
            .is_created()
    );
}

#[test]
fn test_delete_impression_cascades() {
    let store: InMemoryEventStore = create_test_store_with_click();
    store
        .insert_conversion(&create_test_conversion("conv-1", None))
        .unwrap();

    let voided: VoidedEvents = store.delete_impression("imp-1").unwrap();

    assert!(voided.impression.is_some());
    assert_eq!(voided.click.map(|click| click.click_id), Some(String::from("click-1")));
    assert_eq!(voided.conversions.len(), 1);
    assert!(store.conversion("conv-1").unwrap().is_none());
    assert!(store.impression("imp-1").unwrap().is_none());
}
