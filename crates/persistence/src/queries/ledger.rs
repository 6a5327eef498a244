// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Daily budget ledger queries.

use adserve::LedgerEntry;
use adserve_domain::CampaignId;
use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use time::Date;

use crate::data_models::{LedgerRow, date_key};
use crate::diesel_schema::daily_budget_ledger;
use crate::error::PersistenceError;

backend_fn! {
/// Retrieves the ledger entry for a campaign and serving day.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `campaign_id` - The campaign
/// * `date` - The serving day in the serving timezone
///
/// # Returns
///
/// `None` if no charge has opened the entry yet.
///
/// # Errors
///
/// Returns an error if the query fails or the row cannot be decoded.
pub fn get_ledger_entry(
    conn: &mut _,
    campaign_id: &CampaignId,
    date: Date,
) -> Result<Option<LedgerEntry>, PersistenceError> {
    let row: Option<LedgerRow> = daily_budget_ledger::table
        .filter(daily_budget_ledger::campaign_id.eq(campaign_id.as_str()))
        .filter(daily_budget_ledger::ledger_date.eq(date_key(date)))
        .select(LedgerRow::as_select())
        .first(conn)
        .optional()
        .map_err(|e| PersistenceError::QueryFailed(format!("get_ledger_entry: {e}")))?;

    row.map(|row| row.into_entry(date)).transpose()
}
}
