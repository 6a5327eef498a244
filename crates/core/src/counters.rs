// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Cumulative performance counters for campaigns, ad groups and creatives.
//!
//! Every serving event touches all three levels. A [`CounterStore`] applies
//! one [`CounterDelta`] to all three in a single atomic step, so readers never
//! observe an impression counted on a creative but not yet on its campaign.

use std::collections::HashMap;
use std::sync::RwLock;

use adserve_domain::{AdGroupId, CampaignId, CreativeId, PerformanceCounters};
use rust_decimal::Decimal;

use crate::error::CoreError;

/// One entity whose counters are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CounterScope {
    Campaign(CampaignId),
    AdGroup(AdGroupId),
    Creative(CreativeId),
}

impl CounterScope {
    /// Returns the scope type label used by the database.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Campaign(_) => "campaign",
            Self::AdGroup(_) => "ad_group",
            Self::Creative(_) => "creative",
        }
    }

    /// Returns the entity id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Campaign(id) => id.as_str(),
            Self::AdGroup(id) => id.as_str(),
            Self::Creative(id) => id.as_str(),
        }
    }
}

/// The campaign, ad group and creative an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterTarget {
    pub campaign_id: CampaignId,
    pub ad_group_id: AdGroupId,
    pub creative_id: CreativeId,
}

impl CounterTarget {
    /// Returns the three scopes this target updates, campaign first.
    #[must_use]
    pub fn scopes(&self) -> [CounterScope; 3] {
        [
            CounterScope::Campaign(self.campaign_id.clone()),
            CounterScope::AdGroup(self.ad_group_id.clone()),
            CounterScope::Creative(self.creative_id.clone()),
        ]
    }
}

/// A signed change to a set of counters.
///
/// Revenue is tracked for campaigns and ad groups only; creatives ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: Decimal,
    pub revenue: Decimal,
}

impl CounterDelta {
    /// One impression billing `spend`.
    #[must_use]
    pub const fn impression(spend: Decimal) -> Self {
        Self {
            impressions: 1,
            clicks: 0,
            conversions: 0,
            spend,
            revenue: Decimal::ZERO,
        }
    }

    /// One valid click billing `spend`.
    #[must_use]
    pub const fn click(spend: Decimal) -> Self {
        Self {
            impressions: 0,
            clicks: 1,
            conversions: 0,
            spend,
            revenue: Decimal::ZERO,
        }
    }

    /// One verified conversion worth `revenue`.
    #[must_use]
    pub const fn conversion(revenue: Decimal) -> Self {
        Self {
            impressions: 0,
            clicks: 0,
            conversions: 1,
            spend: Decimal::ZERO,
            revenue,
        }
    }

    /// A bare spend adjustment with no event counts.
    #[must_use]
    pub const fn spend(spend: Decimal) -> Self {
        Self {
            impressions: 0,
            clicks: 0,
            conversions: 0,
            spend,
            revenue: Decimal::ZERO,
        }
    }

    /// Returns this delta with its spend dropped.
    #[must_use]
    pub const fn without_spend(&self) -> Self {
        Self {
            impressions: self.impressions,
            clicks: self.clicks,
            conversions: self.conversions,
            spend: Decimal::ZERO,
            revenue: self.revenue,
        }
    }

    /// Returns the delta that undoes this one.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            impressions: -self.impressions,
            clicks: -self.clicks,
            conversions: -self.conversions,
            spend: -self.spend,
            revenue: -self.revenue,
        }
    }

    /// Applies the delta to `counters`, saturating every field at zero.
    pub fn apply_to(&self, counters: &mut PerformanceCounters, scope: &CounterScope) {
        counters.impressions = counters.impressions.saturating_add_signed(self.impressions);
        counters.clicks = counters.clicks.saturating_add_signed(self.clicks);
        counters.conversions = counters.conversions.saturating_add_signed(self.conversions);
        counters.spend = (counters.spend + self.spend).max(Decimal::ZERO);
        if !matches!(scope, CounterScope::Creative(_)) {
            counters.revenue = (counters.revenue + self.revenue).max(Decimal::ZERO);
        }
    }
}

/// Storage for cumulative counters.
pub trait CounterStore: Send + Sync {
    /// Returns the counters for a scope, zero if never touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn counters(&self, scope: &CounterScope) -> Result<PerformanceCounters, CoreError>;

    /// Applies `delta` to the target's campaign, ad group and creative atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails. No level is updated then.
    fn apply(&self, target: &CounterTarget, delta: &CounterDelta) -> Result<(), CoreError>;

    /// Applies `delta` unless it carries spend and the campaign's lifetime
    /// spend has already reached `spend_cap`. A refused delta is still
    /// applied with its spend dropped, and `false` is returned.
    ///
    /// The check and the increment are one atomic step, so lifetime spend
    /// exceeds the cap by at most one delta.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails. No level is updated then.
    fn apply_capped(
        &self,
        target: &CounterTarget,
        delta: &CounterDelta,
        spend_cap: Option<Decimal>,
    ) -> Result<bool, CoreError>;

    /// Sets the starting counters for a scope if it has none yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn seed(&self, scope: &CounterScope, counters: &PerformanceCounters) -> Result<(), CoreError>;
}

/// Counters held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: RwLock<HashMap<CounterScope, PerformanceCounters>>,
}

impl InMemoryCounterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn counters(&self, scope: &CounterScope) -> Result<PerformanceCounters, CoreError> {
        let counters = self
            .counters
            .read()
            .map_err(|_| CoreError::LockPoisoned("counters"))?;
        Ok(counters.get(scope).cloned().unwrap_or_default())
    }

    fn apply(&self, target: &CounterTarget, delta: &CounterDelta) -> Result<(), CoreError> {
        let mut counters = self
            .counters
            .write()
            .map_err(|_| CoreError::LockPoisoned("counters"))?;
        for scope in target.scopes() {
            let entry: &mut PerformanceCounters = counters.entry(scope.clone()).or_default();
            delta.apply_to(entry, &scope);
        }
        Ok(())
    }

    fn apply_capped(
        &self,
        target: &CounterTarget,
        delta: &CounterDelta,
        spend_cap: Option<Decimal>,
    ) -> Result<bool, CoreError> {
        let mut counters = self
            .counters
            .write()
            .map_err(|_| CoreError::LockPoisoned("counters"))?;
        let campaign_spend: Decimal = counters
            .get(&CounterScope::Campaign(target.campaign_id.clone()))
            .map_or(Decimal::ZERO, |c| c.spend);
        let within: bool =
            delta.spend <= Decimal::ZERO || spend_cap.is_none_or(|cap| campaign_spend < cap);
        let applied: CounterDelta = if within { *delta } else { delta.without_spend() };
        for scope in target.scopes() {
            let entry: &mut PerformanceCounters = counters.entry(scope.clone()).or_default();
            applied.apply_to(entry, &scope);
        }
        Ok(within)
    }

    fn seed(&self, scope: &CounterScope, seed: &PerformanceCounters) -> Result<(), CoreError> {
        let mut counters = self
            .counters
            .write()
            .map_err(|_| CoreError::LockPoisoned("counters"))?;
        counters
            .entry(scope.clone())
            .or_insert_with(|| seed.clone());
        Ok(())
    }
}
