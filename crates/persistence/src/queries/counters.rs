// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Cumulative counter queries.

use adserve::CounterScope;
use adserve_domain::PerformanceCounters;
use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};

use crate::data_models::CounterRow;
use crate::diesel_schema::entity_counters;
use crate::error::PersistenceError;

backend_fn! {
/// Retrieves the cumulative counters for one campaign, ad group or creative.
///
/// A scope that has never been touched reads as all zeroes.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_counters(
    conn: &mut _,
    scope: &CounterScope,
) -> Result<PerformanceCounters, PersistenceError> {
    let row: Option<CounterRow> = entity_counters::table
        .filter(entity_counters::scope_type.eq(scope.kind()))
        .filter(entity_counters::scope_id.eq(scope.id()))
        .select(CounterRow::as_select())
        .first(conn)
        .optional()
        .map_err(|e| PersistenceError::QueryFailed(format!("get_counters: {e}")))?;

    Ok(row.map(PerformanceCounters::from).unwrap_or_default())
}
}
