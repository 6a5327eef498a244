// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Applies serving events to counters and the budget ledger.
//!
//! ## Billing point
//!
//! - CPC placements bill at click time. The impression carries the clearing
//!   price as its `cost` but bills nothing; a valid click bills that cost.
//! - CPM placements bill `clearing_price / 1000` at serve time; clicks bill
//!   nothing.
//! - Invalid clicks never bill.
//!
//! An event whose charge is refused is still counted, with zero spend. A
//! charge is refused when the campaign's lifetime spend has reached its
//! `total_budget` or when the day's ledger entry is exhausted. Lifetime spend
//! is checked and incremented atomically by the counter store, so it exceeds
//! `total_budget` by at most one charge. Budget already charged is never
//! refunded, including by reversals.

use std::sync::Arc;

use adserve_domain::{Campaign, PricingModel};
use rust_decimal::{Decimal, RoundingStrategy};
use time::{Date, OffsetDateTime};
use tracing::warn;

use crate::catalog::Catalog;
use crate::counters::{CounterDelta, CounterStore, CounterTarget};
use crate::error::CoreError;
use crate::ledger::{BudgetLedger, ChargeOutcome, LedgerCharge};
use crate::store::{ClickRecord, ConversionRecord, ImpressionRecord};

const IMPRESSIONS_PER_MILLE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Money is stored to the ten-thousandth.
const MONEY_SCALE: u32 = 4;

/// What an impression bills at serve time.
#[must_use]
pub fn impression_charge(pricing_model: PricingModel, clearing_price: Decimal) -> Decimal {
    match pricing_model {
        PricingModel::Cpc => Decimal::ZERO,
        PricingModel::Cpm => (clearing_price / IMPRESSIONS_PER_MILLE)
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero),
    }
}

/// What a click bills.
#[must_use]
pub fn click_charge(pricing_model: PricingModel, impression_cost: Decimal, is_valid: bool) -> Decimal {
    match pricing_model {
        PricingModel::Cpc if is_valid => impression_cost,
        PricingModel::Cpc | PricingModel::Cpm => Decimal::ZERO,
    }
}

/// Applies event deltas to the counter store and the ledger.
pub struct MetricsAggregator {
    catalog: Arc<Catalog>,
    counters: Arc<dyn CounterStore>,
    ledger: Arc<dyn BudgetLedger>,
}

impl std::fmt::Debug for MetricsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAggregator").finish_non_exhaustive()
    }
}

impl MetricsAggregator {
    /// Creates a new aggregator.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        counters: Arc<dyn CounterStore>,
        ledger: Arc<dyn BudgetLedger>,
    ) -> Self {
        Self {
            catalog,
            counters,
            ledger,
        }
    }

    /// Records a served impression.
    ///
    /// # Returns
    ///
    /// The amount the ledger accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign is unknown or a store fails.
    pub fn on_impression(
        &self,
        impression: &ImpressionRecord,
        amount: Decimal,
        date: Date,
        now: OffsetDateTime,
    ) -> Result<Decimal, CoreError> {
        let target: CounterTarget = impression.counter_target();
        self.bill(
            &target,
            LedgerCharge::impression(amount),
            CounterDelta::impression(amount),
            date,
            now,
        )
    }

    /// Records a click. Invalid clicks touch neither counters nor the ledger.
    ///
    /// # Returns
    ///
    /// The amount the ledger accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign is unknown or a store fails.
    pub fn on_click(
        &self,
        click: &ClickRecord,
        amount: Decimal,
        date: Date,
        now: OffsetDateTime,
    ) -> Result<Decimal, CoreError> {
        if !click.is_valid {
            return Ok(Decimal::ZERO);
        }
        let target: CounterTarget = click.counter_target();
        self.bill(
            &target,
            LedgerCharge::click(amount),
            CounterDelta::click(amount),
            date,
            now,
        )
    }

    /// Records a conversion. Unverified conversions are stored but not counted.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign is unknown or a store fails.
    pub fn on_conversion(&self, conversion: &ConversionRecord, date: Date) -> Result<(), CoreError> {
        if !conversion.is_verified {
            return Ok(());
        }
        let campaign: &Campaign = self.campaign(&conversion.counter_target())?;
        self.counters.apply(
            &conversion.counter_target(),
            &CounterDelta::conversion(conversion.conversion_value),
        )?;
        self.ledger.record_conversion(
            &campaign.id,
            date,
            campaign.daily_budget,
            conversion.conversion_value,
        )
    }

    /// Backs an impression out of the counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter store fails.
    pub fn reverse_impression(&self, impression: &ImpressionRecord) -> Result<(), CoreError> {
        self.counters.apply(
            &impression.counter_target(),
            &CounterDelta::impression(impression.billed_amount).negated(),
        )
    }

    /// Backs a click out of the counters. Invalid clicks were never counted.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter store fails.
    pub fn reverse_click(&self, click: &ClickRecord) -> Result<(), CoreError> {
        if !click.is_valid {
            return Ok(());
        }
        self.counters.apply(
            &click.counter_target(),
            &CounterDelta::click(click.cost).negated(),
        )
    }

    /// Backs a conversion out of the counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter store fails.
    pub fn reverse_conversion(&self, conversion: &ConversionRecord) -> Result<(), CoreError> {
        if !conversion.is_verified {
            return Ok(());
        }
        self.counters.apply(
            &conversion.counter_target(),
            &CounterDelta::conversion(conversion.conversion_value).negated(),
        )
    }

    fn campaign(&self, target: &CounterTarget) -> Result<&Campaign, CoreError> {
        self.catalog
            .campaign(&target.campaign_id)
            .ok_or_else(|| CoreError::CampaignNotFound(target.campaign_id.clone()))
    }

    /// Counts the event and bills `charge.amount` if both the lifetime and
    /// the daily budget allow it. Returns the amount billed.
    ///
    /// If the ledger fails, the counters are backed out before the error is
    /// returned, so a failed event is neither counted nor billed.
    fn bill(
        &self,
        target: &CounterTarget,
        charge: LedgerCharge,
        delta: CounterDelta,
        date: Date,
        now: OffsetDateTime,
    ) -> Result<Decimal, CoreError> {
        let campaign: &Campaign = self.campaign(target)?;

        let within_lifetime: bool =
            self.counters
                .apply_capped(target, &delta, campaign.total_budget)?;
        let counted: CounterDelta = if within_lifetime {
            delta
        } else {
            delta.without_spend()
        };
        let ledger_charge: LedgerCharge = if within_lifetime {
            charge
        } else {
            LedgerCharge {
                amount: Decimal::ZERO,
                ..charge
            }
        };

        let outcome: ChargeOutcome = match self.ledger.charge(
            &campaign.id,
            date,
            campaign.daily_budget,
            &ledger_charge,
            now,
        ) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.counters.apply(target, &counted.negated())?;
                return Err(err);
            }
        };

        if !within_lifetime {
            warn!(
                campaign_id = %campaign.id,
                amount = %charge.amount,
                total_budget = ?campaign.total_budget,
                "Lifetime budget exhausted; charge rejected"
            );
            return Ok(Decimal::ZERO);
        }

        if !outcome.accepted {
            self.counters
                .apply(target, &CounterDelta::spend(delta.spend).negated())?;
            warn!(
                campaign_id = %campaign.id,
                amount = %charge.amount,
                total_spend = %outcome.new_total,
                "Daily budget exhausted; charge rejected"
            );
            return Ok(Decimal::ZERO);
        }

        if outcome.newly_exhausted {
            warn!(
                campaign_id = %campaign.id,
                total_spend = %outcome.new_total,
                daily_budget = %campaign.daily_budget,
                "Daily budget reached"
            );
            if campaign.auto_pause_low_performance {
                self.catalog.pause_campaign(&campaign.id)?;
            }
        }

        Ok(charge.amount)
    }
}
