// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Serving event mutations.
//!
//! Inserts use `INSERT OR IGNORE` against the natural unique keys and read
//! back the stored row when nothing was written. Two processes racing on the
//! same request, impression or order therefore agree on a single row.
//!
//! Inserts that reference a parent row return `Ok(None)` when the parent does
//! not exist. The parent is checked explicitly because `MySQL` downgrades
//! foreign key failures to warnings under `INSERT IGNORE`.

use adserve::{
    ClickRecord, ConversionRecord, ImpressionRecord, InsertOutcome, VoidedEvents,
    ViewabilityUpdate,
};
use adserve_audit::AuctionRecord;
use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use tracing::{debug, info};

use crate::data_models::{
    ClickRow, ConversionRow, ImpressionRow, to_count, to_nanos, to_units,
};
use crate::diesel_schema::{auction_records, clicks, conversions, impressions};
use crate::error::PersistenceError;

backend_fn! {
/// Persists an auction record and, when there was a winner, its impression.
///
/// Both rows are written in one transaction. A record whose request id is
/// already stored is not written again; the stored record is returned
/// instead.
///
/// # Errors
///
/// Returns an error if the record cannot be encoded or a statement fails.
pub fn insert_auction(
    conn: &mut _,
    record: &AuctionRecord,
    impression: Option<&ImpressionRecord>,
) -> Result<InsertOutcome<AuctionRecord>, PersistenceError> {
    let record_json: String = serde_json::to_string(record)?;
    let impression_row: Option<ImpressionRow> =
        impression.map(ImpressionRow::from_record).transpose()?;
    let total_eligible: i32 = i32::try_from(record.total_eligible())
        .map_err(|e| PersistenceError::SerializationError(format!("total_eligible: {e}")))?;
    let total_participating: i32 = i32::try_from(record.total_participating())
        .map_err(|e| PersistenceError::SerializationError(format!("total_participating: {e}")))?;
    let winning_bid: Option<i64> = record.winning_bid().map(to_units).transpose()?;
    let clearing_price: Option<i64> = record.clearing_price().map(to_units).transpose()?;

    conn.transaction::<InsertOutcome<AuctionRecord>, PersistenceError, _>(|conn| {
        let inserted: usize = diesel::insert_or_ignore_into(auction_records::table)
            .values((
                auction_records::auction_id.eq(&record.auction_id),
                auction_records::request_id.eq(&record.request_id),
                auction_records::placement_id.eq(record.placement_id.as_str()),
                auction_records::winner_campaign_id
                    .eq(record.winner.as_ref().map(|w| w.campaign_id.as_str())),
                auction_records::winner_creative_id
                    .eq(record.winner.as_ref().map(|w| w.creative_id.as_str())),
                auction_records::winning_bid.eq(winning_bid),
                auction_records::clearing_price.eq(clearing_price),
                auction_records::total_eligible.eq(total_eligible),
                auction_records::total_participating.eq(total_participating),
                auction_records::duration_micros.eq(to_count(record.duration_micros)?),
                auction_records::auction_time.eq(to_nanos(record.auction_time)?),
                auction_records::record_json.eq(&record_json),
            ))
            .execute(conn)?;

        if inserted == 0 {
            let stored: String = auction_records::table
                .filter(auction_records::request_id.eq(&record.request_id))
                .select(auction_records::record_json)
                .first(conn)?;
            debug!(request_id = %record.request_id, "Auction already recorded");
            return Ok(InsertOutcome::Existing(serde_json::from_str(&stored)?));
        }

        if let Some(row) = &impression_row {
            diesel::insert_into(impressions::table)
                .values(row)
                .execute(conn)?;
        }

        info!(
            auction_id = %record.auction_id,
            request_id = %record.request_id,
            served = impression_row.is_some(),
            "Recorded auction"
        );
        Ok(InsertOutcome::Created(record.clone()))
    })
}
}

backend_fn! {
/// Records the amount the ledger accepted for an impression.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the impression does not exist.
pub fn set_impression_billed(
    conn: &mut _,
    impression_id: &str,
    amount: i64,
) -> Result<(), PersistenceError> {
    let rows: usize = diesel::update(impressions::table.find(impression_id))
        .set(impressions::billed_amount.eq(amount))
        .execute(conn)?;
    if rows == 0 {
        return Err(PersistenceError::NotFound(format!(
            "impression {impression_id}"
        )));
    }
    Ok(())
}
}

backend_fn! {
/// Applies a viewability report to an impression.
///
/// # Returns
///
/// The updated impression, or `None` if it does not exist.
///
/// # Errors
///
/// Returns an error if a value is out of range or a statement fails.
pub fn update_viewability(
    conn: &mut _,
    impression_id: &str,
    update: &ViewabilityUpdate,
) -> Result<Option<ImpressionRecord>, PersistenceError> {
    let view_duration_ms: i64 = to_count(update.view_duration_ms)?;
    let scroll_depth: Option<i64> = update.scroll_depth.map(to_units).transpose()?;

    conn.transaction::<Option<ImpressionRecord>, PersistenceError, _>(|conn| {
        let rows: usize = diesel::update(impressions::table.find(impression_id))
            .set((
                impressions::viewable.eq(i32::from(update.viewable)),
                impressions::view_duration_ms.eq(view_duration_ms),
                impressions::scroll_depth.eq(scroll_depth),
            ))
            .execute(conn)?;
        if rows == 0 {
            return Ok(None);
        }

        let row: ImpressionRow = impressions::table
            .find(impression_id)
            .select(ImpressionRow::as_select())
            .first(conn)?;
        row.into_record().map(Some)
    })
}
}

backend_fn! {
/// Persists a click. At most one click is stored per impression.
///
/// # Returns
///
/// `None` if the impression does not exist.
///
/// # Errors
///
/// Returns an error if the click cannot be encoded or a statement fails.
pub fn insert_click(
    conn: &mut _,
    click: &ClickRecord,
) -> Result<Option<InsertOutcome<ClickRecord>>, PersistenceError> {
    let row: ClickRow = ClickRow::from_record(click)?;

    conn.transaction::<Option<InsertOutcome<ClickRecord>>, PersistenceError, _>(|conn| {
        let impression_count: i64 = impressions::table
            .filter(impressions::impression_id.eq(&click.impression_id))
            .count()
            .get_result(conn)?;
        if impression_count == 0 {
            return Ok(None);
        }

        let inserted: usize = diesel::insert_or_ignore_into(clicks::table)
            .values(&row)
            .execute(conn)?;
        if inserted == 0 {
            let stored: ClickRow = clicks::table
                .filter(clicks::impression_id.eq(&click.impression_id))
                .select(ClickRow::as_select())
                .first(conn)?;
            return Ok(Some(InsertOutcome::Existing(stored.into_record()?)));
        }

        debug!(
            click_id = %click.click_id,
            impression_id = %click.impression_id,
            is_valid = click.is_valid,
            "Recorded click"
        );
        Ok(Some(InsertOutcome::Created(click.clone())))
    })
}
}

backend_fn! {
/// Records the amount the ledger accepted for a click.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the click does not exist.
pub fn set_click_cost(conn: &mut _, click_id: &str, amount: i64) -> Result<(), PersistenceError> {
    let rows: usize = diesel::update(clicks::table.find(click_id))
        .set(clicks::cost.eq(amount))
        .execute(conn)?;
    if rows == 0 {
        return Err(PersistenceError::NotFound(format!("click {click_id}")));
    }
    Ok(())
}
}

backend_fn! {
/// Persists a conversion.
///
/// A conversion carrying a transaction or order id is stored at most once
/// per click and id. Conversions without either are always stored.
///
/// # Returns
///
/// `None` if the click does not exist.
///
/// # Errors
///
/// Returns an error if the conversion cannot be encoded or a statement fails.
pub fn insert_conversion(
    conn: &mut _,
    conversion: &ConversionRecord,
) -> Result<Option<InsertOutcome<ConversionRecord>>, PersistenceError> {
    let row: ConversionRow = ConversionRow::from_record(conversion)?;

    conn.transaction::<Option<InsertOutcome<ConversionRecord>>, PersistenceError, _>(|conn| {
        let click_count: i64 = clicks::table
            .filter(clicks::click_id.eq(&conversion.click_id))
            .count()
            .get_result(conn)?;
        if click_count == 0 {
            return Ok(None);
        }

        let inserted: usize = diesel::insert_or_ignore_into(conversions::table)
            .values(&row)
            .execute(conn)?;
        if inserted == 0 {
            let stored: ConversionRow = match &row.dedupe_key {
                Some(key) => conversions::table
                    .filter(conversions::click_id.eq(&conversion.click_id))
                    .filter(conversions::dedupe_key.eq(key))
                    .select(ConversionRow::as_select())
                    .first(conn)?,
                None => conversions::table
                    .find(&conversion.conversion_id)
                    .select(ConversionRow::as_select())
                    .first(conn)?,
            };
            debug!(
                click_id = %conversion.click_id,
                "Conversion already recorded"
            );
            return Ok(Some(InsertOutcome::Existing(stored.into_record()?)));
        }

        info!(
            conversion_id = %conversion.conversion_id,
            click_id = %conversion.click_id,
            conversion_value = %conversion.conversion_value,
            is_verified = conversion.is_verified,
            "Recorded conversion"
        );
        Ok(Some(InsertOutcome::Created(conversion.clone())))
    })
}
}

backend_fn! {
/// Deletes a conversion.
///
/// # Returns
///
/// The deleted conversion, for counter reversal. Empty if it did not exist.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub fn delete_conversion(
    conn: &mut _,
    conversion_id: &str,
) -> Result<VoidedEvents, PersistenceError> {
    conn.transaction::<VoidedEvents, PersistenceError, _>(|conn| {
        let row: Option<ConversionRow> = conversions::table
            .find(conversion_id)
            .select(ConversionRow::as_select())
            .first(conn)
            .optional()?;
        let Some(row) = row else {
            return Ok(VoidedEvents::default());
        };

        diesel::delete(conversions::table.find(conversion_id)).execute(conn)?;
        info!(conversion_id, "Deleted conversion");

        Ok(VoidedEvents {
            conversions: vec![row.into_record()?],
            ..VoidedEvents::default()
        })
    })
}
}

backend_fn! {
/// Deletes a click together with its conversions.
///
/// # Returns
///
/// The deleted rows, for counter reversal. Empty if the click did not exist.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub fn delete_click(conn: &mut _, click_id: &str) -> Result<VoidedEvents, PersistenceError> {
    conn.transaction::<VoidedEvents, PersistenceError, _>(|conn| {
        let click: Option<ClickRow> = clicks::table
            .find(click_id)
            .select(ClickRow::as_select())
            .first(conn)
            .optional()?;
        let Some(click) = click else {
            return Ok(VoidedEvents::default());
        };

        let conversion_rows: Vec<ConversionRow> = conversions::table
            .filter(conversions::click_id.eq(click_id))
            .select(ConversionRow::as_select())
            .load(conn)?;

        diesel::delete(conversions::table.filter(conversions::click_id.eq(click_id)))
            .execute(conn)?;
        diesel::delete(clicks::table.find(click_id)).execute(conn)?;
        info!(
            click_id,
            conversions = conversion_rows.len(),
            "Deleted click"
        );

        Ok(VoidedEvents {
            impression: None,
            click: Some(click.into_record()?),
            conversions: conversion_rows
                .into_iter()
                .map(ConversionRow::into_record)
                .collect::<Result<Vec<ConversionRecord>, PersistenceError>>()?,
        })
    })
}
}

backend_fn! {
/// Deletes an impression, its click and that click's conversions.
///
/// The auction record is kept; it documents the auction regardless of what
/// happened to the impression afterwards.
///
/// # Returns
///
/// The deleted rows, for counter reversal. Empty if the impression did not
/// exist.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub fn delete_impression(
    conn: &mut _,
    impression_id: &str,
) -> Result<VoidedEvents, PersistenceError> {
    conn.transaction::<VoidedEvents, PersistenceError, _>(|conn| {
        let impression: Option<ImpressionRow> = impressions::table
            .find(impression_id)
            .select(ImpressionRow::as_select())
            .first(conn)
            .optional()?;
        let Some(impression) = impression else {
            return Ok(VoidedEvents::default());
        };

        let click: Option<ClickRow> = clicks::table
            .filter(clicks::impression_id.eq(impression_id))
            .select(ClickRow::as_select())
            .first(conn)
            .optional()?;

        let mut conversion_rows: Vec<ConversionRow> = Vec::new();
        if let Some(click) = &click {
            conversion_rows = conversions::table
                .filter(conversions::click_id.eq(&click.click_id))
                .select(ConversionRow::as_select())
                .load(conn)?;
            diesel::delete(conversions::table.filter(conversions::click_id.eq(&click.click_id)))
                .execute(conn)?;
            diesel::delete(clicks::table.find(&click.click_id)).execute(conn)?;
        }
        diesel::delete(impressions::table.find(impression_id)).execute(conn)?;
        info!(
            impression_id,
            had_click = click.is_some(),
            conversions = conversion_rows.len(),
            "Deleted impression"
        );

        Ok(VoidedEvents {
            impression: Some(impression.into_record()?),
            click: click.map(ClickRow::into_record).transpose()?,
            conversions: conversion_rows
                .into_iter()
                .map(ConversionRow::into_record)
                .collect::<Result<Vec<ConversionRecord>, PersistenceError>>()?,
        })
    })
}
}
