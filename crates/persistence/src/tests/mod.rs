// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]


use adserve::{ClickRecord, ConversionRecord, ImpressionRecord};
use adserve_audit::{AuctionRecord, AuctionWinner, BidSnapshot, ContextSnapshot};
use adserve_domain::{AdGroupId, CampaignId, ConversionType, CreativeId, PlacementId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::OffsetDateTime;
use time::macros::{date, datetime};

use crate::Persistence;

pub fn create_test_persistence() -> Persistence {
    Persistence::new_in_memory().expect("in-memory database")
}

pub fn create_test_now() -> OffsetDateTime {
    datetime!(2026-03-02 10:00:00.123456789 UTC)
}

pub fn create_test_date() -> time::Date {
    date!(2026 - 03 - 02)
}

/// An auction with two bids; camp-a wins and clears at 4.51.
pub fn create_test_auction(request_id: &str) -> (AuctionRecord, ImpressionRecord) {
    let winner_bid: BidSnapshot = BidSnapshot::new(
        CampaignId::new("camp-a"),
        AdGroupId::new("ag-a"),
        CreativeId::new("cr-a"),
        dec!(5.00),
        dec!(8),
    )
    .unwrap();
    let runner_up: BidSnapshot = BidSnapshot::new(
        CampaignId::new("camp-b"),
        AdGroupId::new("ag-b"),
        CreativeId::new("cr-b"),
        dec!(4.00),
        dec!(9),
    )
    .unwrap();
    let auction_id: String = format!("auction-{request_id}");
    let record: AuctionRecord = AuctionRecord {
        auction_id: auction_id.clone(),
        request_id: request_id.to_string(),
        placement_id: PlacementId::new("home-banner"),
        context: ContextSnapshot::new(String::from(r#"{"session_id":"session-1"}"#)),
        eligible_campaign_ids: vec![CampaignId::new("camp-a"), CampaignId::new("camp-b")],
        participating_bids: vec![winner_bid, runner_up],
        winner: Some(AuctionWinner {
            campaign_id: CampaignId::new("camp-a"),
            ad_group_id: AdGroupId::new("ag-a"),
            creative_id: CreativeId::new("cr-a"),
            winning_bid: dec!(5.00),
            clearing_price: dec!(4.51),
        }),
        duration_micros: 412,
        auction_time: create_test_now(),
    };
    let impression: ImpressionRecord = ImpressionRecord {
        impression_id: format!("imp-{request_id}"),
        auction_id: Some(auction_id),
        request_id: Some(request_id.to_string()),
        campaign_id: CampaignId::new("camp-a"),
        ad_group_id: AdGroupId::new("ag-a"),
        creative_id: CreativeId::new("cr-a"),
        placement_id: PlacementId::new("home-banner"),
        session_id: String::from("session-1"),
        user_agent: Some(String::from("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0")),
        ip_address: Some(String::from("203.0.113.7")),
        page_url: String::from("https://news.example/home"),
        referrer_url: None,
        country: Some(String::from("IN")),
        region: Some(String::from("KA")),
        city: Some(String::from("Bengaluru")),
        device_type: String::from("mobile"),
        browser: Some(String::from("firefox")),
        os: None,
        bid_amount: dec!(5.00),
        cost: dec!(4.51),
        billed_amount: Decimal::ZERO,
        viewable: false,
        view_duration_ms: 0,
        scroll_depth: None,
        served_at: create_test_now(),
    };
    (record, impression)
}

pub fn create_test_click(impression: &ImpressionRecord, ip_address: &str) -> ClickRecord {
    ClickRecord {
        click_id: format!("click-{}", impression.impression_id),
        impression_id: impression.impression_id.clone(),
        campaign_id: impression.campaign_id.clone(),
        ad_group_id: impression.ad_group_id.clone(),
        creative_id: impression.creative_id.clone(),
        ip_address: Some(ip_address.to_string()),
        user_agent: impression.user_agent.clone(),
        destination_url: String::from("https://shop.example/landing"),
        click_position: Some(adserve_domain::ClickPosition { x: 120, y: 48 }),
        time_to_click: dec!(2.5),
        is_valid: true,
        fraud_score: Decimal::ZERO,
        fraud_reason: String::new(),
        cost: Decimal::ZERO,
        clicked_at: impression.served_at + time::Duration::seconds(3),
    }
}

pub fn create_test_conversion(
    click: &ClickRecord,
    conversion_id: &str,
    order_id: Option<&str>,
) -> ConversionRecord {
    ConversionRecord {
        conversion_id: conversion_id.to_string(),
        click_id: click.click_id.clone(),
        campaign_id: click.campaign_id.clone(),
        ad_group_id: click.ad_group_id.clone(),
        creative_id: click.creative_id.clone(),
        conversion_type: ConversionType::Purchase,
        conversion_value: dec!(1499.50),
        currency: String::from("INR"),
        order_id: order_id.map(str::to_string),
        transaction_id: None,
        attribution_model: String::from("last_click"),
        verification_method: Some(String::from("pixel")),
        is_verified: true,
        custom_data: serde_json::json!({ "sku": "A-100" }),
        converted_at: click.clicked_at + time::Duration::minutes(5),
    }
}
