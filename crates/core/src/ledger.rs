// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Per-campaign, per-day budget ledger.
//!
//! ## Invariants
//!
//! - A charge is check-and-increment: it is accepted only if the entry was
//!   below its budget before the charge, so `total_spend` never exceeds
//!   `daily_budget` by more than one charge
//! - `is_budget_exceeded` is sticky for the day once tripped
//! - `budget_exhausted_at` is set exactly once
//! - Zero-amount charges only move the event counters and are always accepted
//!
//! Implementations must make [`BudgetLedger::charge`] atomic per key. The
//! in-memory ledger serializes each key behind its own mutex; the database
//! ledger uses a conditional `UPDATE`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use adserve_domain::CampaignId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::CoreError;

/// Ledger key: one entry per campaign per serving day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub campaign_id: CampaignId,
    pub date: Date,
}

impl LedgerKey {
    /// Creates a new key.
    #[must_use]
    pub const fn new(campaign_id: CampaignId, date: Date) -> Self {
        Self { campaign_id, date }
    }
}

/// A campaign's spend and activity for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub campaign_id: CampaignId,
    pub date: Date,
    /// The campaign's daily budget when the entry was opened.
    pub daily_budget: Decimal,
    pub total_spend: Decimal,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: Decimal,
    pub budget_exhausted_at: Option<OffsetDateTime>,
    pub is_budget_exceeded: bool,
}

impl LedgerEntry {
    /// Opens an empty entry with a snapshot of the daily budget.
    #[must_use]
    pub fn open(key: LedgerKey, daily_budget: Decimal) -> Self {
        Self {
            campaign_id: key.campaign_id,
            date: key.date,
            daily_budget,
            total_spend: Decimal::ZERO,
            impressions: 0,
            clicks: 0,
            conversions: 0,
            revenue: Decimal::ZERO,
            budget_exhausted_at: None,
            is_budget_exceeded: false,
        }
    }

    /// Returns true if the entry can still absorb spend.
    #[must_use]
    pub fn has_budget_available(&self) -> bool {
        !self.is_budget_exceeded && self.total_spend < self.daily_budget
    }

    /// Applies a charge in place.
    ///
    /// This is the single definition of charge semantics; every ledger
    /// implementation must produce the same outcome for the same entry.
    pub fn apply_charge(&mut self, charge: &LedgerCharge, now: OffsetDateTime) -> ChargeOutcome {
        self.impressions += charge.impressions;
        self.clicks += charge.clicks;

        if charge.amount > Decimal::ZERO && !self.has_budget_available() {
            return ChargeOutcome {
                accepted: false,
                new_total: self.total_spend,
                exceeded: true,
                newly_exhausted: false,
            };
        }

        self.total_spend += charge.amount;

        let mut newly_exhausted: bool = false;
        if !self.is_budget_exceeded && self.total_spend >= self.daily_budget {
            self.is_budget_exceeded = true;
            if self.budget_exhausted_at.is_none() {
                self.budget_exhausted_at = Some(now);
            }
            newly_exhausted = true;
        }

        ChargeOutcome {
            accepted: true,
            new_total: self.total_spend,
            exceeded: self.is_budget_exceeded,
            newly_exhausted,
        }
    }
}

/// A charge against a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCharge {
    pub amount: Decimal,
    pub impressions: u64,
    pub clicks: u64,
}

impl LedgerCharge {
    /// A served impression billing `amount`.
    #[must_use]
    pub const fn impression(amount: Decimal) -> Self {
        Self {
            amount,
            impressions: 1,
            clicks: 0,
        }
    }

    /// A valid click billing `amount`.
    #[must_use]
    pub const fn click(amount: Decimal) -> Self {
        Self {
            amount,
            impressions: 0,
            clicks: 1,
        }
    }

    /// A pure spend charge with no event counts.
    #[must_use]
    pub const fn spend(amount: Decimal) -> Self {
        Self {
            amount,
            impressions: 0,
            clicks: 0,
        }
    }
}

/// The result of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeOutcome {
    /// False if the entry was already exhausted and the amount was not added.
    pub accepted: bool,
    /// Spend after the charge.
    pub new_total: Decimal,
    /// True if the entry is exhausted after the charge.
    pub exceeded: bool,
    /// True only for the charge that tripped the exhaustion flag.
    pub newly_exhausted: bool,
}

/// Atomic per-campaign daily spend ledger.
pub trait BudgetLedger: Send + Sync {
    /// Returns true if no entry exists for the key, or the entry is below budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn check_available(&self, campaign_id: &CampaignId, date: Date) -> Result<bool, CoreError>;

    /// Atomically applies a charge, opening the entry with `daily_budget` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn charge(
        &self,
        campaign_id: &CampaignId,
        date: Date,
        daily_budget: Decimal,
        charge: &LedgerCharge,
        now: OffsetDateTime,
    ) -> Result<ChargeOutcome, CoreError>;

    /// Adds a verified conversion and its revenue to the day's entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn record_conversion(
        &self,
        campaign_id: &CampaignId,
        date: Date,
        daily_budget: Decimal,
        revenue: Decimal,
    ) -> Result<(), CoreError>;

    /// Returns the entry for the key, if one has been opened.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn entry(&self, campaign_id: &CampaignId, date: Date) -> Result<Option<LedgerEntry>, CoreError>;

    /// Returns today's spend for the key, zero if no entry exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn spend(&self, campaign_id: &CampaignId, date: Date) -> Result<Decimal, CoreError> {
        Ok(self
            .entry(campaign_id, date)?
            .map_or(Decimal::ZERO, |entry| entry.total_spend))
    }
}

type EntryCell = Arc<Mutex<LedgerEntry>>;

/// In-process ledger with one mutex per key.
///
/// The outer map lock is held only long enough to find or open an entry, so
/// charges for different campaigns never contend.
#[derive(Debug, Default)]
pub struct InMemoryBudgetLedger {
    entries: Mutex<HashMap<LedgerKey, EntryCell>>,
}

impl InMemoryBudgetLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &LedgerKey) -> Result<Option<EntryCell>, CoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::LockPoisoned("ledger index"))?;
        Ok(entries.get(key).cloned())
    }

    fn cell_or_open(&self, key: LedgerKey, daily_budget: Decimal) -> Result<EntryCell, CoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::LockPoisoned("ledger index"))?;
        Ok(Arc::clone(entries.entry(key.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(LedgerEntry::open(key, daily_budget)))
        })))
    }
}

impl BudgetLedger for InMemoryBudgetLedger {
    fn check_available(&self, campaign_id: &CampaignId, date: Date) -> Result<bool, CoreError> {
        let key: LedgerKey = LedgerKey::new(campaign_id.clone(), date);
        match self.cell(&key)? {
            None => Ok(true),
            Some(cell) => {
                let entry = cell
                    .lock()
                    .map_err(|_| CoreError::LockPoisoned("ledger entry"))?;
                Ok(entry.has_budget_available())
            }
        }
    }

    fn charge(
        &self,
        campaign_id: &CampaignId,
        date: Date,
        daily_budget: Decimal,
        charge: &LedgerCharge,
        now: OffsetDateTime,
    ) -> Result<ChargeOutcome, CoreError> {
        let cell: EntryCell =
            self.cell_or_open(LedgerKey::new(campaign_id.clone(), date), daily_budget)?;
        let mut entry = cell
            .lock()
            .map_err(|_| CoreError::LockPoisoned("ledger entry"))?;
        Ok(entry.apply_charge(charge, now))
    }

    fn record_conversion(
        &self,
        campaign_id: &CampaignId,
        date: Date,
        daily_budget: Decimal,
        revenue: Decimal,
    ) -> Result<(), CoreError> {
        let cell: EntryCell =
            self.cell_or_open(LedgerKey::new(campaign_id.clone(), date), daily_budget)?;
        let mut entry = cell
            .lock()
            .map_err(|_| CoreError::LockPoisoned("ledger entry"))?;
        entry.conversions += 1;
        entry.revenue += revenue;
        Ok(())
    }

    fn entry(&self, campaign_id: &CampaignId, date: Date) -> Result<Option<LedgerEntry>, CoreError> {
        let key: LedgerKey = LedgerKey::new(campaign_id.clone(), date);
        match self.cell(&key)? {
            None => Ok(None),
            Some(cell) => {
                let entry = cell
                    .lock()
                    .map_err(|_| CoreError::LockPoisoned("ledger entry"))?;
                Ok(Some(entry.clone()))
            }
        }
    }
}
