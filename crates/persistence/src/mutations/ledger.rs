// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Daily budget ledger mutations.
//!
//! A charge is a conditional `UPDATE` that only adds spend while the entry is
//! below budget and not yet flagged. The database serializes concurrent
//! charges against the same row, so at most one charge can cross the budget
//! and every later positive charge is rejected.

use adserve::{ChargeOutcome, LedgerCharge};
use adserve_domain::CampaignId;
use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use crate::data_models::{LedgerRow, date_key, from_units, to_count, to_nanos, to_units};
use crate::diesel_schema::daily_budget_ledger;
use crate::error::PersistenceError;

backend_fn! {
/// Atomically applies a charge to a campaign's ledger entry for one day.
///
/// The entry is opened with a snapshot of `daily_budget` on first use. Event
/// counts are always added; a positive amount is added only while the entry
/// has budget available.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `campaign_id` - The campaign being charged
/// * `date` - The serving day in the serving timezone
/// * `daily_budget` - The campaign's daily budget, used only to open the entry
/// * `charge` - The amount and event counts to apply
/// * `now` - Recorded as the exhaustion time if this charge trips the budget
///
/// # Errors
///
/// Returns an error if any statement fails. The transaction is rolled back
/// and the entry is unchanged.
pub fn charge_ledger(
    conn: &mut _,
    campaign_id: &CampaignId,
    date: Date,
    daily_budget: Decimal,
    charge: &LedgerCharge,
    now: OffsetDateTime,
) -> Result<ChargeOutcome, PersistenceError> {
    let key: String = date_key(date);
    let budget_units: i64 = to_units(daily_budget)?;
    let amount: i64 = to_units(charge.amount)?;
    let impressions: i64 = to_count(charge.impressions)?;
    let clicks: i64 = to_count(charge.clicks)?;
    let now_nanos: i64 = to_nanos(now)?;

    conn.transaction::<ChargeOutcome, PersistenceError, _>(|conn| {
        diesel::insert_or_ignore_into(daily_budget_ledger::table)
            .values((
                daily_budget_ledger::campaign_id.eq(campaign_id.as_str()),
                daily_budget_ledger::ledger_date.eq(&key),
                daily_budget_ledger::daily_budget.eq(budget_units),
                daily_budget_ledger::total_spend.eq(0_i64),
                daily_budget_ledger::impressions.eq(0_i64),
                daily_budget_ledger::clicks.eq(0_i64),
                daily_budget_ledger::conversions.eq(0_i64),
                daily_budget_ledger::revenue.eq(0_i64),
                daily_budget_ledger::is_budget_exceeded.eq(0),
            ))
            .execute(conn)?;

        let pk: (&str, &str) = (campaign_id.as_str(), key.as_str());

        let applied: usize = if amount > 0 {
            diesel::update(daily_budget_ledger::table.find(pk))
                .filter(daily_budget_ledger::is_budget_exceeded.eq(0))
                .filter(daily_budget_ledger::total_spend.lt(daily_budget_ledger::daily_budget))
                .set((
                    daily_budget_ledger::total_spend.eq(daily_budget_ledger::total_spend + amount),
                    daily_budget_ledger::impressions
                        .eq(daily_budget_ledger::impressions + impressions),
                    daily_budget_ledger::clicks.eq(daily_budget_ledger::clicks + clicks),
                ))
                .execute(conn)?
        } else {
            diesel::update(daily_budget_ledger::table.find(pk))
                .set((
                    daily_budget_ledger::total_spend.eq(daily_budget_ledger::total_spend + amount),
                    daily_budget_ledger::impressions
                        .eq(daily_budget_ledger::impressions + impressions),
                    daily_budget_ledger::clicks.eq(daily_budget_ledger::clicks + clicks),
                ))
                .execute(conn)?
        };
        let accepted: bool = applied == 1;

        let mut newly_exhausted: bool = false;
        if accepted {
            let tripped: usize = diesel::update(daily_budget_ledger::table.find(pk))
                .filter(daily_budget_ledger::is_budget_exceeded.eq(0))
                .filter(daily_budget_ledger::total_spend.ge(daily_budget_ledger::daily_budget))
                .set((
                    daily_budget_ledger::is_budget_exceeded.eq(1),
                    daily_budget_ledger::budget_exhausted_at.eq(Some(now_nanos)),
                ))
                .execute(conn)?;
            newly_exhausted = tripped == 1;
        } else {
            diesel::update(daily_budget_ledger::table.find(pk))
                .set((
                    daily_budget_ledger::impressions
                        .eq(daily_budget_ledger::impressions + impressions),
                    daily_budget_ledger::clicks.eq(daily_budget_ledger::clicks + clicks),
                ))
                .execute(conn)?;
        }

        let row: LedgerRow = daily_budget_ledger::table
            .find(pk)
            .select(LedgerRow::as_select())
            .first(conn)?;
        let total_spend: Decimal = from_units(row.total_spend);

        if newly_exhausted {
            info!(
                campaign_id = campaign_id.as_str(),
                date = %key,
                total_spend = %total_spend,
                "Daily budget exhausted"
            );
        } else {
            debug!(
                campaign_id = campaign_id.as_str(),
                date = %key,
                accepted,
                total_spend = %total_spend,
                "Applied ledger charge"
            );
        }

        Ok(ChargeOutcome {
            accepted,
            new_total: total_spend,
            exceeded: !accepted || row.is_budget_exceeded != 0,
            newly_exhausted,
        })
    })
}
}

backend_fn! {
/// Adds one verified conversion and its revenue to the day's ledger entry.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn record_ledger_conversion(
    conn: &mut _,
    campaign_id: &CampaignId,
    date: Date,
    daily_budget: Decimal,
    revenue: Decimal,
) -> Result<(), PersistenceError> {
    let key: String = date_key(date);
    let budget_units: i64 = to_units(daily_budget)?;
    let revenue_units: i64 = to_units(revenue)?;

    conn.transaction::<(), PersistenceError, _>(|conn| {
        diesel::insert_or_ignore_into(daily_budget_ledger::table)
            .values((
                daily_budget_ledger::campaign_id.eq(campaign_id.as_str()),
                daily_budget_ledger::ledger_date.eq(&key),
                daily_budget_ledger::daily_budget.eq(budget_units),
                daily_budget_ledger::total_spend.eq(0_i64),
                daily_budget_ledger::impressions.eq(0_i64),
                daily_budget_ledger::clicks.eq(0_i64),
                daily_budget_ledger::conversions.eq(0_i64),
                daily_budget_ledger::revenue.eq(0_i64),
                daily_budget_ledger::is_budget_exceeded.eq(0),
            ))
            .execute(conn)?;

        diesel::update(daily_budget_ledger::table.find((campaign_id.as_str(), key.as_str())))
            .set((
                daily_budget_ledger::conversions.eq(daily_budget_ledger::conversions + 1_i64),
                daily_budget_ledger::revenue.eq(daily_budget_ledger::revenue + revenue_units),
            ))
            .execute(conn)?;

        debug!(
            campaign_id = campaign_id.as_str(),
            date = %key,
            revenue = %revenue,
            "Recorded conversion in ledger"
        );
        Ok(())
    })
}
}
