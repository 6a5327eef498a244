// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Cumulative counter mutations.
//!
//! Deltas are applied as in-database increments so concurrent serving
//! processes never lose an update. Reversals may drive a column below zero;
//! the same transaction clamps it back to zero.

use adserve::{CounterDelta, CounterScope, CounterTarget};
use adserve_domain::PerformanceCounters;
use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use rust_decimal::Decimal;
use tracing::debug;

use crate::data_models::{to_count, to_units};
use crate::diesel_schema::entity_counters;
use crate::error::PersistenceError;

backend_fn! {
/// Applies one delta to the campaign, ad group and creative counters of an event.
///
/// Revenue is not tracked for creatives. With a `spend_cap`, positive spend
/// is added only while the campaign's lifetime spend is below the cap; the
/// check is a conditional `UPDATE` inside the same transaction. A refused
/// delta still counts its events and returns `false`.
///
/// # Errors
///
/// Returns an error if any statement fails. No scope is updated in that case.
pub fn apply_counter_delta(
    conn: &mut _,
    target: &CounterTarget,
    delta: &CounterDelta,
    spend_cap: Option<Decimal>,
) -> Result<bool, PersistenceError> {
    let spend: i64 = to_units(delta.spend)?;
    let revenue: i64 = to_units(delta.revenue)?;
    let cap_units: Option<i64> = match spend_cap {
        Some(cap) if delta.spend > Decimal::ZERO => Some(to_units(cap)?),
        _ => None,
    };
    let has_negative: bool = delta.impressions < 0
        || delta.clicks < 0
        || delta.conversions < 0
        || delta.spend < Decimal::ZERO
        || delta.revenue < Decimal::ZERO;

    conn.transaction::<bool, PersistenceError, _>(|conn| {
        let mut within: bool = true;
        for scope in target.scopes() {
            let scope_revenue: i64 = if matches!(scope, CounterScope::Creative(_)) {
                0
            } else {
                revenue
            };

            diesel::insert_or_ignore_into(entity_counters::table)
                .values((
                    entity_counters::scope_type.eq(scope.kind()),
                    entity_counters::scope_id.eq(scope.id()),
                    entity_counters::impressions.eq(0_i64),
                    entity_counters::clicks.eq(0_i64),
                    entity_counters::conversions.eq(0_i64),
                    entity_counters::spend.eq(0_i64),
                    entity_counters::revenue.eq(0_i64),
                ))
                .execute(conn)?;

            if let (CounterScope::Campaign(_), Some(cap)) = (&scope, cap_units) {
                let charged: usize =
                    diesel::update(entity_counters::table.find((scope.kind(), scope.id())))
                        .filter(entity_counters::spend.lt(cap))
                        .set(entity_counters::spend.eq(entity_counters::spend + spend))
                        .execute(conn)?;
                within = charged == 1;
            }
            let already_charged: bool =
                matches!(scope, CounterScope::Campaign(_)) && cap_units.is_some();
            let scope_spend: i64 = if within && !already_charged { spend } else { 0 };

            diesel::update(entity_counters::table.find((scope.kind(), scope.id())))
                .set((
                    entity_counters::impressions.eq(entity_counters::impressions + delta.impressions),
                    entity_counters::clicks.eq(entity_counters::clicks + delta.clicks),
                    entity_counters::conversions.eq(entity_counters::conversions + delta.conversions),
                    entity_counters::spend.eq(entity_counters::spend + scope_spend),
                    entity_counters::revenue.eq(entity_counters::revenue + scope_revenue),
                ))
                .execute(conn)?;
        }

        if has_negative {
            diesel::update(entity_counters::table.filter(entity_counters::impressions.lt(0_i64)))
                .set(entity_counters::impressions.eq(0_i64))
                .execute(conn)?;
            diesel::update(entity_counters::table.filter(entity_counters::clicks.lt(0_i64)))
                .set(entity_counters::clicks.eq(0_i64))
                .execute(conn)?;
            diesel::update(entity_counters::table.filter(entity_counters::conversions.lt(0_i64)))
                .set(entity_counters::conversions.eq(0_i64))
                .execute(conn)?;
            diesel::update(entity_counters::table.filter(entity_counters::spend.lt(0_i64)))
                .set(entity_counters::spend.eq(0_i64))
                .execute(conn)?;
            diesel::update(entity_counters::table.filter(entity_counters::revenue.lt(0_i64)))
                .set(entity_counters::revenue.eq(0_i64))
                .execute(conn)?;
        }

        debug!(
            campaign_id = target.campaign_id.as_str(),
            impressions = delta.impressions,
            clicks = delta.clicks,
            conversions = delta.conversions,
            spend = %delta.spend,
            within_cap = within,
            "Applied counter delta"
        );
        Ok(within)
    })
}
}

backend_fn! {
/// Seeds the counters for a scope from catalog history.
///
/// Existing counters are left untouched, so restarting a server against a
/// populated database does not double count.
///
/// # Errors
///
/// Returns an error if a value is out of range or the insert fails.
pub fn seed_counters(
    conn: &mut _,
    scope: &CounterScope,
    counters: &PerformanceCounters,
) -> Result<(), PersistenceError> {
    let inserted: usize = diesel::insert_or_ignore_into(entity_counters::table)
        .values((
            entity_counters::scope_type.eq(scope.kind()),
            entity_counters::scope_id.eq(scope.id()),
            entity_counters::impressions.eq(to_count(counters.impressions)?),
            entity_counters::clicks.eq(to_count(counters.clicks)?),
            entity_counters::conversions.eq(to_count(counters.conversions)?),
            entity_counters::spend.eq(to_units(counters.spend)?),
            entity_counters::revenue.eq(to_units(counters.revenue)?),
        ))
        .execute(conn)
        .map_err(|e| PersistenceError::QueryFailed(format!("seed_counters: {e}")))?;

    if inserted == 1 {
        debug!(scope_type = scope.kind(), scope_id = scope.id(), "Seeded counters");
    }
    Ok(())
}
}
