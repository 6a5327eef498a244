// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The stateful serving engine.
//!
//! Pure rules live in `adserve-domain`. This crate owns everything shared
//! between concurrent requests: the budget ledger, cumulative counters, the
//! event store and the catalog's pause overrides. Each is a trait with an
//! in-memory implementation here and a database implementation in
//! `adserve-persistence`.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod auction;
mod catalog;
mod counters;
mod error;
mod ledger;
mod metrics;
mod store;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use auction::{
    AuctionEngine, AuctionOutcome, AuctionRequest, AuctionStage, MIN_PRICE_INCREMENT,
    RecordedAuction, clearing_price, rank_bids, select_winner,
};
pub use catalog::{Catalog, CatalogData};
pub use counters::{
    CounterDelta, CounterScope, CounterStore, CounterTarget, InMemoryCounterStore,
};
pub use error::CoreError;
pub use ledger::{
    BudgetLedger, ChargeOutcome, InMemoryBudgetLedger, LedgerCharge, LedgerEntry, LedgerKey,
};
pub use metrics::{MetricsAggregator, click_charge, impression_charge};
pub use store::{
    ClickRecord, ConversionRecord, EventStore, ImpressionRecord, InMemoryEventStore,
    InsertOutcome, VoidedEvents, ViewabilityUpdate,
};

/// The shared state behind one serving engine.
///
/// All three handles may point at the same backing object when one store
/// implements every trait.
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn BudgetLedger>,
    pub counters: Arc<dyn CounterStore>,
    pub events: Arc<dyn EventStore>,
}

impl Stores {
    /// Process-local stores; state is lost on exit.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            ledger: Arc::new(InMemoryBudgetLedger::new()),
            counters: Arc::new(InMemoryCounterStore::new()),
            events: Arc::new(InMemoryEventStore::new()),
        }
    }

    /// Uses one object for every store.
    #[must_use]
    pub fn shared<S>(store: &Arc<S>) -> Self
    where
        S: BudgetLedger + CounterStore + EventStore + 'static,
    {
        Self {
            ledger: Arc::clone(store) as Arc<dyn BudgetLedger>,
            counters: Arc::clone(store) as Arc<dyn CounterStore>,
            events: Arc::clone(store) as Arc<dyn EventStore>,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
