// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Mutation modules for persistence layer.
//!
//! This module contains all write operations for the persistence layer.
//!
//! ## Module Organization
//!
//! - `ledger`: Atomic daily budget charges and conversion roll-ups
//! - `counters`: Atomic counter increments and seeding
//! - `events`: Idempotent event inserts, updates and corrective deletes
//!
//! ## Backend-Specific Functions
//!
//! All mutation functions are generated in backend-specific monomorphic versions:
//! - Functions suffixed with `_sqlite` for `SQLite`
//! - Functions suffixed with `_mysql` for `MySQL`/`MariaDB`
//!
//! Every multi-statement mutation runs inside one database transaction.

pub mod counters;
pub mod events;
pub mod ledger;

pub use counters::{
    apply_counter_delta_mysql, apply_counter_delta_sqlite, seed_counters_mysql,
    seed_counters_sqlite,
};
pub use events::{
    delete_click_mysql, delete_click_sqlite, delete_conversion_mysql, delete_conversion_sqlite,
    delete_impression_mysql, delete_impression_sqlite, insert_auction_mysql,
    insert_auction_sqlite, insert_click_mysql, insert_click_sqlite, insert_conversion_mysql,
    insert_conversion_sqlite, set_click_cost_mysql, set_click_cost_sqlite,
    set_impression_billed_mysql, set_impression_billed_sqlite, update_viewability_mysql,
    update_viewability_sqlite,
};
pub use ledger::{
    charge_ledger_mysql, charge_ledger_sqlite, record_ledger_conversion_mysql,
    record_ledger_conversion_sqlite,
};
