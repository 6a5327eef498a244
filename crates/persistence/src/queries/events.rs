// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Serving event queries.
//!
//! Auction records are read back from their stored JSON document; the
//! denormalized winner columns exist for reporting only.

use adserve::{ClickRecord, ConversionRecord, ImpressionRecord};
use adserve_audit::AuctionRecord;
use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use tracing::debug;

use crate::data_models::{ClickRow, ConversionRow, ImpressionRow};
use crate::diesel_schema::{auction_records, clicks, conversions, impressions};
use crate::error::PersistenceError;

backend_fn! {
/// Retrieves the auction recorded for a request id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored record cannot be
/// deserialized.
pub fn get_auction_by_request_id(
    conn: &mut _,
    request_id: &str,
) -> Result<Option<AuctionRecord>, PersistenceError> {
    let stored: Option<String> = auction_records::table
        .filter(auction_records::request_id.eq(request_id))
        .select(auction_records::record_json)
        .first(conn)
        .optional()
        .map_err(|e| PersistenceError::QueryFailed(format!("get_auction_by_request_id: {e}")))?;

    match stored {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => {
            debug!(request_id, "No auction recorded for request");
            Ok(None)
        }
    }
}
}

backend_fn! {
/// Retrieves an impression by id.
///
/// # Errors
///
/// Returns an error if the query fails or the row cannot be decoded.
pub fn get_impression(
    conn: &mut _,
    impression_id: &str,
) -> Result<Option<ImpressionRecord>, PersistenceError> {
    let row: Option<ImpressionRow> = impressions::table
        .filter(impressions::impression_id.eq(impression_id))
        .select(ImpressionRow::as_select())
        .first(conn)
        .optional()
        .map_err(|e| PersistenceError::QueryFailed(format!("get_impression: {e}")))?;

    row.map(ImpressionRow::into_record).transpose()
}
}

backend_fn! {
/// Retrieves the impression served for an auction, if the auction had a winner.
///
/// # Errors
///
/// Returns an error if the query fails or the row cannot be decoded.
pub fn get_impression_for_auction(
    conn: &mut _,
    auction_id: &str,
) -> Result<Option<ImpressionRecord>, PersistenceError> {
    let row: Option<ImpressionRow> = impressions::table
        .filter(impressions::auction_id.eq(auction_id))
        .select(ImpressionRow::as_select())
        .first(conn)
        .optional()
        .map_err(|e| PersistenceError::QueryFailed(format!("get_impression_for_auction: {e}")))?;

    row.map(ImpressionRow::into_record).transpose()
}
}

backend_fn! {
/// Retrieves a click by id.
///
/// # Errors
///
/// Returns an error if the query fails or the row cannot be decoded.
pub fn get_click(conn: &mut _, click_id: &str) -> Result<Option<ClickRecord>, PersistenceError> {
    let row: Option<ClickRow> = clicks::table
        .filter(clicks::click_id.eq(click_id))
        .select(ClickRow::as_select())
        .first(conn)
        .optional()
        .map_err(|e| PersistenceError::QueryFailed(format!("get_click: {e}")))?;

    row.map(ClickRow::into_record).transpose()
}
}

backend_fn! {
/// Counts clicks recorded from an IP address at or after `since_nanos`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_clicks_from_ip_since(
    conn: &mut _,
    ip_address: &str,
    since_nanos: i64,
) -> Result<i64, PersistenceError> {
    clicks::table
        .filter(clicks::ip_address.eq(ip_address))
        .filter(clicks::clicked_at.ge(since_nanos))
        .count()
        .get_result(conn)
        .map_err(|e| PersistenceError::QueryFailed(format!("count_clicks_from_ip_since: {e}")))
}
}

backend_fn! {
/// Retrieves a conversion by id.
///
/// # Errors
///
/// Returns an error if the query fails or the row cannot be decoded.
pub fn get_conversion(
    conn: &mut _,
    conversion_id: &str,
) -> Result<Option<ConversionRecord>, PersistenceError> {
    let row: Option<ConversionRow> = conversions::table
        .filter(conversions::conversion_id.eq(conversion_id))
        .select(ConversionRow::as_select())
        .first(conn)
        .optional()
        .map_err(|e| PersistenceError::QueryFailed(format!("get_conversion: {e}")))?;

    row.map(ConversionRow::into_record).transpose()
}
}
