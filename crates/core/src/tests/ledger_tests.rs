// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use adserve_domain::CampaignId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::{Date, OffsetDateTime};
use time::macros::date;

use crate::tests::helpers::create_test_now;
use crate::{BudgetLedger, ChargeOutcome, InMemoryBudgetLedger, LedgerCharge, LedgerEntry};

const TODAY: Date = date!(2026 - 03 - 02);

#[test]
fn test_check_available_without_entry() {
    let ledger: InMemoryBudgetLedger = InMemoryBudgetLedger::new();
    assert!(
        ledger
            .check_available(&CampaignId::new("camp-a"), TODAY)
            .unwrap()
    );
}

#[test]
fn test_charge_opens_entry_with_budget_snapshot() {
    let ledger: InMemoryBudgetLedger = InMemoryBudgetLedger::new();
    let campaign_id: CampaignId = CampaignId::new("camp-a");

    let outcome: ChargeOutcome = ledger
        .charge(
            &campaign_id,
            TODAY,
            dec!(10.00),
            &LedgerCharge::click(dec!(2.50)),
            create_test_now(),
        )
        .unwrap();

    assert!(outcome.accepted);
    assert_eq!(outcome.new_total, dec!(2.50));
    assert!(!outcome.exceeded);

    let entry: LedgerEntry = ledger.entry(&campaign_id, TODAY).unwrap().unwrap();
    assert_eq!(entry.daily_budget, dec!(10.00));
    assert_eq!(entry.clicks, 1);
    assert_eq!(entry.impressions, 0);
    assert!(entry.budget_exhausted_at.is_none());
}

#[test]
fn test_crossing_budget_sets_sticky_flag_once() {
    let ledger: InMemoryBudgetLedger = InMemoryBudgetLedger::new();
    let campaign_id: CampaignId = CampaignId::new("camp-a");
    let now: OffsetDateTime = create_test_now();

    let first: ChargeOutcome = ledger
        .charge(&campaign_id, TODAY, dec!(5.00), &LedgerCharge::spend(dec!(6.00)), now)
        .unwrap();
    assert!(first.accepted);
    assert!(first.exceeded);
    assert!(first.newly_exhausted);

    let later: OffsetDateTime = now + time::Duration::minutes(5);
    let second: ChargeOutcome = ledger
        .charge(&campaign_id, TODAY, dec!(5.00), &LedgerCharge::spend(dec!(1.00)), later)
        .unwrap();
    assert!(!second.accepted);
    assert!(!second.newly_exhausted);
    assert_eq!(second.new_total, dec!(6.00));

    let entry: LedgerEntry = ledger.entry(&campaign_id, TODAY).unwrap().unwrap();
    assert!(entry.is_budget_exceeded);
    assert_eq!(entry.budget_exhausted_at, Some(now));
    assert!(!ledger.check_available(&campaign_id, TODAY).unwrap());
}

#[test]
fn test_zero_charge_counts_after_exhaustion() {
    let ledger: InMemoryBudgetLedger = InMemoryBudgetLedger::new();
    let campaign_id: CampaignId = CampaignId::new("camp-a");
    let now: OffsetDateTime = create_test_now();

    ledger
        .charge(&campaign_id, TODAY, dec!(1.00), &LedgerCharge::spend(dec!(1.00)), now)
        .unwrap();
    let outcome: ChargeOutcome = ledger
        .charge(&campaign_id, TODAY, dec!(1.00), &LedgerCharge::impression(Decimal::ZERO), now)
        .unwrap();

    assert!(outcome.accepted);
    let entry: LedgerEntry = ledger.entry(&campaign_id, TODAY).unwrap().unwrap();
    assert_eq!(entry.impressions, 1);
    assert_eq!(entry.total_spend, dec!(1.00));
}

#[test]
fn test_days_are_independent() {
    let ledger: InMemoryBudgetLedger = InMemoryBudgetLedger::new();
    let campaign_id: CampaignId = CampaignId::new("camp-a");

    ledger
        .charge(
            &campaign_id,
            TODAY,
            dec!(1.00),
            &LedgerCharge::spend(dec!(1.00)),
            create_test_now(),
        )
        .unwrap();

    assert!(!ledger.check_available(&campaign_id, TODAY).unwrap());
    assert!(
        ledger
            .check_available(&campaign_id, date!(2026 - 03 - 03))
            .unwrap()
    );
}

#[test]
fn test_record_conversion_adds_revenue() {
    let ledger: InMemoryBudgetLedger = InMemoryBudgetLedger::new();
    let campaign_id: CampaignId = CampaignId::new("camp-a");

    ledger
        .record_conversion(&campaign_id, TODAY, dec!(10.00), dec!(499.00))
        .unwrap();
    ledger
        .record_conversion(&campaign_id, TODAY, dec!(10.00), dec!(1.00))
        .unwrap();

    let entry: LedgerEntry = ledger.entry(&campaign_id, TODAY).unwrap().unwrap();
    assert_eq!(entry.conversions, 2);
    assert_eq!(entry.revenue, dec!(500.00));
    assert_eq!(entry.total_spend, Decimal::ZERO);
}

#[test]
fn test_concurrent_charges_accept_exactly_the_budget() {
    let ledger: InMemoryBudgetLedger = InMemoryBudgetLedger::new();
    let campaign_id: CampaignId = CampaignId::new("camp-a");
    let now: OffsetDateTime = create_test_now();

    let accepted: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..100)
            .map(|_| {
                scope.spawn(|| {
                    ledger
                        .charge(
                            &campaign_id,
                            TODAY,
                            dec!(10.00),
                            &LedgerCharge::click(dec!(1.00)),
                            now,
                        )
                        .unwrap()
                        .accepted
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|accepted| *accepted)
            .count()
    });

    let entry: LedgerEntry = ledger.entry(&campaign_id, TODAY).unwrap().unwrap();
    assert_eq!(accepted, 10);
    assert_eq!(entry.total_spend, dec!(10.00));
    assert_eq!(entry.clicks, 100);
    assert!(entry.is_budget_exceeded);
}

#[test]
fn test_concurrent_overshoot_bounded_by_one_charge() {
    let ledger: InMemoryBudgetLedger = InMemoryBudgetLedger::new();
    let campaign_id: CampaignId = CampaignId::new("camp-a");
    let now: OffsetDateTime = create_test_now();

    std::thread::scope(|scope| {
        for _ in 0..50 {
            scope.spawn(|| {
                ledger
                    .charge(
                        &campaign_id,
                        TODAY,
                        dec!(10.00),
                        &LedgerCharge::spend(dec!(3.00)),
                        now,
                    )
                    .unwrap();
            });
        }
    });

    let entry: LedgerEntry = ledger.entry(&campaign_id, TODAY).unwrap().unwrap();
    assert_eq!(entry.total_spend, dec!(12.00));
    assert!(entry.total_spend <= entry.daily_budget + dec!(3.00));
}
