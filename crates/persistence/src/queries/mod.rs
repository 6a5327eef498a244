// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Query modules for persistence layer.
//!
//! This module contains all read-only queries for the persistence layer.
//!
//! ## Module Organization
//!
//! - `ledger`: Daily budget ledger lookups
//! - `counters`: Cumulative entity counter lookups
//! - `events`: Auction, impression, click and conversion lookups
//!
//! ## Backend-Specific Functions
//!
//! All query functions are generated in backend-specific monomorphic versions:
//! - Functions suffixed with `_sqlite` for `SQLite`
//! - Functions suffixed with `_mysql` for `MySQL`/`MariaDB`
//!
//! The `Persistence` adapter in `lib.rs` dispatches to the appropriate version
//! based on the active backend connection.

pub mod counters;
pub mod events;
pub mod ledger;

pub use counters::{get_counters_mysql, get_counters_sqlite};
pub use events::{
    count_clicks_from_ip_since_mysql, count_clicks_from_ip_since_sqlite,
    get_auction_by_request_id_mysql, get_auction_by_request_id_sqlite, get_click_mysql,
    get_click_sqlite, get_conversion_mysql, get_conversion_sqlite, get_impression_for_auction_mysql,
    get_impression_for_auction_sqlite, get_impression_mysql, get_impression_sqlite,
};
pub use ledger::{get_ledger_entry_mysql, get_ledger_entry_sqlite};
