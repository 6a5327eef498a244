// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use adserve_audit::{AuctionWinner, BidSnapshot};
use adserve_domain::{
    AdGroupId, CampaignId, CreativeId, MAX_BID_AMOUNT, MAX_QUALITY_SCORE, OrganizationId,
    PlacementId, PricingModel,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::tests::helpers::{
    TestEngine, create_test_catalog_data, create_test_engine, create_test_now,
    create_test_request,
};
use crate::{
    AuctionOutcome, AuctionRequest, AuctionStage, CatalogData, CoreError, ImpressionRecord,
    LedgerCharge, RecordedAuction, clearing_price, rank_bids, select_winner,
};

fn create_test_bid(campaign: &str, bid_amount: Decimal, quality_score: Decimal) -> BidSnapshot {
    BidSnapshot::new(
        CampaignId::new(campaign),
        AdGroupId::new(&format!("ag-{campaign}")),
        CreativeId::new(&format!("cr-{campaign}")),
        bid_amount,
        quality_score,
    )
    .unwrap()
}

fn expect_recorded(outcome: AuctionOutcome) -> RecordedAuction {
    match outcome {
        AuctionOutcome::Recorded(recorded) => recorded,
        AuctionOutcome::NoBids => panic!("expected a recorded auction"),
    }
}

#[test]
fn test_second_price_scenario() {
    let test: TestEngine = create_test_engine(create_test_catalog_data(PricingModel::Cpc));

    let recorded: RecordedAuction =
        expect_recorded(test.engine.run(&create_test_request("req-1")).unwrap());

    let winner: &AuctionWinner = recorded.record.winner.as_ref().unwrap();
    assert_eq!(winner.campaign_id, CampaignId::new("camp-a"));
    assert_eq!(winner.winning_bid, dec!(5.00));
    assert_eq!(winner.clearing_price, dec!(4.51));
    assert_eq!(recorded.record.total_eligible(), 2);
    assert_eq!(recorded.record.total_participating(), 2);
    assert_eq!(recorded.record.participating_bids[0].ad_rank, dec!(40.0));
    assert_eq!(recorded.record.participating_bids[1].ad_rank, dec!(36.0));
    assert!(recorded.record.is_consistent());
    assert!(!recorded.replayed);

    let impression: ImpressionRecord = recorded.impression.unwrap();
    assert_eq!(impression.creative_id, CreativeId::new("cr-a"));
    assert_eq!(impression.bid_amount, dec!(5.00));
    assert_eq!(impression.cost, dec!(4.51));
    assert_eq!(impression.billed_amount, Decimal::ZERO);
    assert_eq!(impression.ip_address.as_deref(), Some("203.0.113.7"));
}

#[test]
fn test_single_bid_pays_own_bid() {
    let mut data: CatalogData = create_test_catalog_data(PricingModel::Cpc);
    data.campaigns.retain(|campaign| campaign.id.as_str() == "camp-a");
    data.ad_groups.retain(|ad_group| ad_group.id.as_str() == "ag-a");
    data.creatives.retain(|creative| creative.id.as_str() == "cr-a");
    let test: TestEngine = create_test_engine(data);

    let recorded: RecordedAuction =
        expect_recorded(test.engine.run(&create_test_request("req-1")).unwrap());

    assert_eq!(recorded.record.clearing_price(), Some(dec!(5.00)));
}

#[test]
fn test_no_eligible_campaigns_writes_nothing() {
    let mut data: CatalogData = create_test_catalog_data(PricingModel::Cpc);
    for campaign in &mut data.campaigns {
        campaign.targeting.devices = vec![String::from("desktop")];
    }
    let test: TestEngine = create_test_engine(data);

    let outcome: AuctionOutcome = test.engine.run(&create_test_request("req-1")).unwrap();

    assert_eq!(outcome, AuctionOutcome::NoBids);
    assert!(
        test.stores
            .events
            .auction_by_request_id("req-1")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_device_targeting_excludes_regardless_of_bid() {
    let mut data: CatalogData = create_test_catalog_data(PricingModel::Cpc);
    data.campaigns[0].default_bid = dec!(500.00);
    data.campaigns[0].targeting.devices = vec![String::from("desktop")];
    let test: TestEngine = create_test_engine(data);

    let recorded: RecordedAuction =
        expect_recorded(test.engine.run(&create_test_request("req-1")).unwrap());

    assert_eq!(
        recorded.record.eligible_campaign_ids,
        vec![CampaignId::new("camp-b")]
    );
}

#[test]
fn test_below_minimum_bid_records_without_winner() {
    let mut data: CatalogData = create_test_catalog_data(PricingModel::Cpc);
    data.placements[0].minimum_bid = dec!(10.00);
    let test: TestEngine = create_test_engine(data);

    let recorded: RecordedAuction =
        expect_recorded(test.engine.run(&create_test_request("req-1")).unwrap());

    assert!(recorded.record.winner.is_none());
    assert!(recorded.impression.is_none());
    assert_eq!(recorded.record.total_participating(), 2);
    assert!(
        test.stores
            .events
            .auction_by_request_id("req-1")
            .unwrap()
            .is_some()
    );
}

#[test]
fn test_replay_returns_stored_auction() {
    let test: TestEngine = create_test_engine(create_test_catalog_data(PricingModel::Cpc));
    let request: AuctionRequest = create_test_request("req-1");

    let first: RecordedAuction = expect_recorded(test.engine.run(&request).unwrap());
    let second: RecordedAuction = expect_recorded(test.engine.run(&request).unwrap());

    assert!(second.replayed);
    assert_eq!(first.record, second.record);
    assert_eq!(first.impression, second.impression);
}

#[test]
fn test_concurrent_replays_write_one_record() {
    let test: TestEngine = create_test_engine(create_test_catalog_data(PricingModel::Cpc));
    let request: AuctionRequest = create_test_request("req-race");

    let auction_ids: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| expect_recorded(test.engine.run(&request).unwrap())))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().record.auction_id)
            .collect()
    });

    assert!(auction_ids.iter().all(|id| id == &auction_ids[0]));
}

#[test]
fn test_paused_campaign_sits_out() {
    let test: TestEngine = create_test_engine(create_test_catalog_data(PricingModel::Cpc));
    test.catalog.pause_campaign(&CampaignId::new("camp-a")).unwrap();

    let recorded: RecordedAuction =
        expect_recorded(test.engine.run(&create_test_request("req-1")).unwrap());

    let winner: &AuctionWinner = recorded.record.winner.as_ref().unwrap();
    assert_eq!(winner.campaign_id, CampaignId::new("camp-b"));
    assert_eq!(winner.clearing_price, dec!(4.00));
}

#[test]
fn test_exhausted_daily_budget_sits_out() {
    let test: TestEngine = create_test_engine(create_test_catalog_data(PricingModel::Cpc));
    test.stores
        .ledger
        .charge(
            &CampaignId::new("camp-a"),
            time::macros::date!(2026 - 03 - 02),
            dec!(100.00),
            &LedgerCharge::spend(dec!(100.00)),
            create_test_now(),
        )
        .unwrap();

    let recorded: RecordedAuction =
        expect_recorded(test.engine.run(&create_test_request("req-1")).unwrap());

    assert_eq!(
        recorded.record.eligible_campaign_ids,
        vec![CampaignId::new("camp-b")]
    );
}

#[test]
fn test_other_organization_never_competes() {
    let mut data: CatalogData = create_test_catalog_data(PricingModel::Cpc);
    data.campaigns[0].organization_id = OrganizationId::new("org-2");
    let test: TestEngine = create_test_engine(data);

    let recorded: RecordedAuction =
        expect_recorded(test.engine.run(&create_test_request("req-1")).unwrap());

    assert_eq!(recorded.record.total_eligible(), 1);
}

#[test]
fn test_unknown_and_inactive_placements() {
    let mut data: CatalogData = create_test_catalog_data(PricingModel::Cpc);
    data.placements[0].is_active = false;
    let test: TestEngine = create_test_engine(data);

    assert!(matches!(
        test.engine.run(&create_test_request("req-1")),
        Err(CoreError::PlacementInactive(_))
    ));

    let mut request: AuctionRequest = create_test_request("req-2");
    request.placement_id = PlacementId::new("missing");
    assert!(matches!(
        test.engine.run(&request),
        Err(CoreError::PlacementNotFound(_))
    ));
}

#[test]
fn test_clearing_price_bounds() {
    let cases: [(Decimal, Decimal, Decimal, Decimal); 4] = [
        (dec!(5.00), dec!(8.0), dec!(4.00), dec!(9.0)),
        (dec!(1.00), dec!(3.0), dec!(2.90), dec!(1.0)),
        (dec!(0.50), dec!(10.0), dec!(0.10), dec!(7.0)),
        (dec!(2.00), dec!(6.0), dec!(2.00), dec!(6.0)),
    ];

    for (winner_bid, winner_q, runner_bid, runner_q) in cases {
        let winner: BidSnapshot = create_test_bid("w", winner_bid, winner_q);
        let runner_up: BidSnapshot = create_test_bid("r", runner_bid, runner_q);
        let price: Decimal = clearing_price(&winner, Some(&runner_up));

        assert!(price <= winner.bid_amount);
        assert!(price >= runner_up.ad_rank / winner.quality_score || price == winner.bid_amount);
        assert!(price >= dec!(0.01));
    }
}

#[test]
fn test_clearing_price_rounds_up_to_the_cent() {
    let winner: BidSnapshot = create_test_bid("w", dec!(5.00), dec!(3.0));
    let runner_up: BidSnapshot = create_test_bid("r", dec!(1.00), dec!(10.0));

    assert_eq!(clearing_price(&winner, Some(&runner_up)), dec!(3.35));
}

#[test]
fn test_clearing_price_too_large_to_represent_pays_bid() {
    let winner: BidSnapshot = create_test_bid(
        "w",
        dec!(5.00),
        Decimal::from_parts(1, 0, 0, false, 28),
    );
    let runner_up: BidSnapshot = create_test_bid("r", MAX_BID_AMOUNT, MAX_QUALITY_SCORE);

    assert_eq!(clearing_price(&winner, Some(&runner_up)), dec!(5.00));
}

#[test]
fn test_largest_catalog_values_run_an_auction() {
    let mut data: CatalogData = create_test_catalog_data(PricingModel::Cpc);
    data.campaigns[0].default_bid = MAX_BID_AMOUNT;
    data.creatives[0].quality_score = Some(MAX_QUALITY_SCORE);
    data.campaigns[1].default_bid = MAX_BID_AMOUNT;
    data.creatives[1].quality_score = Some(MAX_QUALITY_SCORE);
    let test: TestEngine = create_test_engine(data);

    let recorded: RecordedAuction =
        expect_recorded(test.engine.run(&create_test_request("req-1")).unwrap());

    // Bids round to the cent, so 9999.9999 bids 10000.00.
    assert_eq!(recorded.record.participating_bids.len(), 2);
    assert_eq!(recorded.record.clearing_price(), Some(dec!(10000.00)));
}

#[test]
fn test_clearing_price_zero_quality_pays_bid() {
    let winner: BidSnapshot = create_test_bid("w", dec!(5.00), Decimal::ZERO);
    let runner_up: BidSnapshot = create_test_bid("r", dec!(1.00), dec!(1.0));

    assert_eq!(clearing_price(&winner, Some(&runner_up)), dec!(5.00));
}

#[test]
fn test_rank_bids_is_stable_on_ties() {
    let mut bids: Vec<BidSnapshot> = vec![
        create_test_bid("a", dec!(2.00), dec!(5.0)),
        create_test_bid("b", dec!(5.00), dec!(2.0)),
        create_test_bid("c", dec!(3.00), dec!(5.0)),
    ];

    rank_bids(&mut bids);

    let order: Vec<&str> = bids.iter().map(|bid| bid.campaign_id.as_str()).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
}

#[test]
fn test_select_winner_requires_minimum() {
    let bids: Vec<BidSnapshot> = vec![create_test_bid("a", dec!(0.05), dec!(9.0))];

    assert!(select_winner(&bids, dec!(0.10)).is_none());
    assert!(select_winner(&bids, dec!(0.05)).is_some());
    assert!(select_winner(&[], dec!(0.05)).is_none());
}

#[test]
fn test_stage_order() {
    let mut stage: AuctionStage = AuctionStage::Received;
    let mut seen: Vec<&str> = vec![stage.as_str()];
    while let Some(next) = stage.next() {
        assert!(next > stage);
        stage = next;
        seen.push(stage.as_str());
    }

    assert_eq!(
        seen,
        vec!["received", "filtered", "bid", "ranked", "cleared", "recorded"]
    );
}
