// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Row types and column encodings.
//!
//! Money, scores and percentages are stored as `BIGINT` ten-thousandths so
//! that ledger arithmetic runs exactly inside the database. Timestamps are
//! stored as `BIGINT` Unix nanoseconds in UTC, which keeps range filters on
//! `clicked_at` ordinal on both backends.

use std::str::FromStr;

use adserve::{ClickRecord, ConversionRecord, ImpressionRecord, LedgerEntry};
use adserve_domain::{
    AdGroupId, CampaignId, ClickPosition, ConversionType, CreativeId, PerformanceCounters,
    PlacementId,
};
use diesel::prelude::*;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};

use crate::diesel_schema::{clicks, conversions, daily_budget_ledger, entity_counters, impressions};
use crate::error::PersistenceError;

/// Decimal places kept for stored amounts.
pub const MONEY_SCALE: u32 = 4;

const MONEY_FACTOR: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Encodes an amount as ten-thousandths.
///
/// # Errors
///
/// Returns an error if the amount does not fit in an `i64`.
pub fn to_units(value: Decimal) -> Result<i64, PersistenceError> {
    value
        .checked_mul(MONEY_FACTOR)
        .map(|scaled| scaled.round())
        .and_then(|scaled| scaled.to_i64())
        .ok_or_else(|| PersistenceError::SerializationError(format!("amount out of range: {value}")))
}

/// Decodes ten-thousandths into an amount.
#[must_use]
pub fn from_units(units: i64) -> Decimal {
    Decimal::new(units, MONEY_SCALE).normalize()
}

/// Encodes a timestamp as Unix nanoseconds.
///
/// # Errors
///
/// Returns an error for timestamps outside the `i64` nanosecond range.
pub fn to_nanos(value: OffsetDateTime) -> Result<i64, PersistenceError> {
    i64::try_from(value.unix_timestamp_nanos())
        .map_err(|e| PersistenceError::SerializationError(format!("timestamp {value}: {e}")))
}

/// Decodes Unix nanoseconds into a UTC timestamp.
///
/// # Errors
///
/// Returns an error if the value is not a valid timestamp.
pub fn from_nanos(nanos: i64) -> Result<OffsetDateTime, PersistenceError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .map_err(|e| PersistenceError::SerializationError(format!("timestamp {nanos}: {e}")))
}

/// Ledger dates are keyed as `YYYY-MM-DD`.
#[must_use]
pub fn date_key(date: Date) -> String {
    date.to_string()
}

/// Encodes an event count.
///
/// # Errors
///
/// Returns an error if the count exceeds `i64::MAX`.
pub fn to_count(value: u64) -> Result<i64, PersistenceError> {
    i64::try_from(value)
        .map_err(|e| PersistenceError::SerializationError(format!("count {value}: {e}")))
}

/// Decodes a stored count. Counters are clamped at zero, so a negative value
/// never reaches this point.
#[must_use]
pub fn from_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn to_flag(value: bool) -> i32 {
    i32::from(value)
}

const fn from_flag(value: i32) -> bool {
    value != 0
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = daily_budget_ledger)]
pub struct LedgerRow {
    pub campaign_id: String,
    pub ledger_date: String,
    pub daily_budget: i64,
    pub total_spend: i64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub revenue: i64,
    pub budget_exhausted_at: Option<i64>,
    pub is_budget_exceeded: i32,
}

impl LedgerRow {
    /// Converts the row into a ledger entry for `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the exhaustion timestamp is invalid.
    pub fn into_entry(self, date: Date) -> Result<LedgerEntry, PersistenceError> {
        Ok(LedgerEntry {
            campaign_id: CampaignId::new(&self.campaign_id),
            date,
            daily_budget: from_units(self.daily_budget),
            total_spend: from_units(self.total_spend),
            impressions: from_count(self.impressions),
            clicks: from_count(self.clicks),
            conversions: from_count(self.conversions),
            revenue: from_units(self.revenue),
            budget_exhausted_at: self.budget_exhausted_at.map(from_nanos).transpose()?,
            is_budget_exceeded: from_flag(self.is_budget_exceeded),
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = entity_counters)]
pub struct CounterRow {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: i64,
    pub revenue: i64,
}

impl From<CounterRow> for PerformanceCounters {
    fn from(row: CounterRow) -> Self {
        Self {
            impressions: from_count(row.impressions),
            clicks: from_count(row.clicks),
            conversions: from_count(row.conversions),
            spend: from_units(row.spend),
            revenue: from_units(row.revenue),
        }
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = impressions)]
pub struct ImpressionRow {
    pub impression_id: String,
    pub auction_id: Option<String>,
    pub request_id: Option<String>,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub creative_id: String,
    pub placement_id: String,
    pub session_id: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub page_url: String,
    pub referrer_url: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub device_type: String,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub bid_amount: i64,
    pub cost: i64,
    pub billed_amount: i64,
    pub viewable: i32,
    pub view_duration_ms: i64,
    pub scroll_depth: Option<i64>,
    pub served_at: i64,
}

impl ImpressionRow {
    /// Encodes an impression for insertion.
    ///
    /// # Errors
    ///
    /// Returns an error if an amount or timestamp is out of range.
    pub fn from_record(record: &ImpressionRecord) -> Result<Self, PersistenceError> {
        Ok(Self {
            impression_id: record.impression_id.clone(),
            auction_id: record.auction_id.clone(),
            request_id: record.request_id.clone(),
            campaign_id: record.campaign_id.as_str().to_string(),
            ad_group_id: record.ad_group_id.as_str().to_string(),
            creative_id: record.creative_id.as_str().to_string(),
            placement_id: record.placement_id.as_str().to_string(),
            session_id: record.session_id.clone(),
            user_agent: record.user_agent.clone(),
            ip_address: record.ip_address.clone(),
            page_url: record.page_url.clone(),
            referrer_url: record.referrer_url.clone(),
            country: record.country.clone(),
            region: record.region.clone(),
            city: record.city.clone(),
            device_type: record.device_type.clone(),
            browser: record.browser.clone(),
            os: record.os.clone(),
            bid_amount: to_units(record.bid_amount)?,
            cost: to_units(record.cost)?,
            billed_amount: to_units(record.billed_amount)?,
            viewable: to_flag(record.viewable),
            view_duration_ms: to_count(record.view_duration_ms)?,
            scroll_depth: record.scroll_depth.map(to_units).transpose()?,
            served_at: to_nanos(record.served_at)?,
        })
    }

    /// Decodes the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the serve timestamp is invalid.
    pub fn into_record(self) -> Result<ImpressionRecord, PersistenceError> {
        Ok(ImpressionRecord {
            impression_id: self.impression_id,
            auction_id: self.auction_id,
            request_id: self.request_id,
            campaign_id: CampaignId::new(&self.campaign_id),
            ad_group_id: AdGroupId::new(&self.ad_group_id),
            creative_id: CreativeId::new(&self.creative_id),
            placement_id: PlacementId::new(&self.placement_id),
            session_id: self.session_id,
            user_agent: self.user_agent,
            ip_address: self.ip_address,
            page_url: self.page_url,
            referrer_url: self.referrer_url,
            country: self.country,
            region: self.region,
            city: self.city,
            device_type: self.device_type,
            browser: self.browser,
            os: self.os,
            bid_amount: from_units(self.bid_amount),
            cost: from_units(self.cost),
            billed_amount: from_units(self.billed_amount),
            viewable: from_flag(self.viewable),
            view_duration_ms: from_count(self.view_duration_ms),
            scroll_depth: self.scroll_depth.map(from_units),
            served_at: from_nanos(self.served_at)?,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = clicks)]
pub struct ClickRow {
    pub click_id: String,
    pub impression_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub creative_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub destination_url: String,
    pub click_x: Option<i32>,
    pub click_y: Option<i32>,
    pub time_to_click: i64,
    pub is_valid: i32,
    pub fraud_score: i64,
    pub fraud_reason: String,
    pub cost: i64,
    pub clicked_at: i64,
}

impl ClickRow {
    /// Encodes a click for insertion.
    ///
    /// # Errors
    ///
    /// Returns an error if an amount or timestamp is out of range.
    pub fn from_record(record: &ClickRecord) -> Result<Self, PersistenceError> {
        Ok(Self {
            click_id: record.click_id.clone(),
            impression_id: record.impression_id.clone(),
            campaign_id: record.campaign_id.as_str().to_string(),
            ad_group_id: record.ad_group_id.as_str().to_string(),
            creative_id: record.creative_id.as_str().to_string(),
            ip_address: record.ip_address.clone(),
            user_agent: record.user_agent.clone(),
            destination_url: record.destination_url.clone(),
            click_x: record.click_position.map(|position| position.x),
            click_y: record.click_position.map(|position| position.y),
            time_to_click: to_units(record.time_to_click)?,
            is_valid: to_flag(record.is_valid),
            fraud_score: to_units(record.fraud_score)?,
            fraud_reason: record.fraud_reason.clone(),
            cost: to_units(record.cost)?,
            clicked_at: to_nanos(record.clicked_at)?,
        })
    }

    /// Decodes the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the click timestamp is invalid.
    pub fn into_record(self) -> Result<ClickRecord, PersistenceError> {
        let click_position: Option<ClickPosition> = match (self.click_x, self.click_y) {
            (Some(x), Some(y)) => Some(ClickPosition { x, y }),
            _ => None,
        };
        Ok(ClickRecord {
            click_id: self.click_id,
            impression_id: self.impression_id,
            campaign_id: CampaignId::new(&self.campaign_id),
            ad_group_id: AdGroupId::new(&self.ad_group_id),
            creative_id: CreativeId::new(&self.creative_id),
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            destination_url: self.destination_url,
            click_position,
            time_to_click: from_units(self.time_to_click),
            is_valid: from_flag(self.is_valid),
            fraud_score: from_units(self.fraud_score),
            fraud_reason: self.fraud_reason,
            cost: from_units(self.cost),
            clicked_at: from_nanos(self.clicked_at)?,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = conversions)]
pub struct ConversionRow {
    pub conversion_id: String,
    pub click_id: String,
    pub campaign_id: String,
    pub ad_group_id: String,
    pub creative_id: String,
    pub conversion_type: String,
    pub conversion_value: i64,
    pub currency: String,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub dedupe_key: Option<String>,
    pub attribution_model: String,
    pub verification_method: Option<String>,
    pub is_verified: i32,
    pub custom_data: String,
    pub converted_at: i64,
}

impl ConversionRow {
    /// Encodes a conversion for insertion.
    ///
    /// # Errors
    ///
    /// Returns an error if an amount, timestamp or the custom payload cannot
    /// be encoded.
    pub fn from_record(record: &ConversionRecord) -> Result<Self, PersistenceError> {
        Ok(Self {
            conversion_id: record.conversion_id.clone(),
            click_id: record.click_id.clone(),
            campaign_id: record.campaign_id.as_str().to_string(),
            ad_group_id: record.ad_group_id.as_str().to_string(),
            creative_id: record.creative_id.as_str().to_string(),
            conversion_type: record.conversion_type.as_str().to_string(),
            conversion_value: to_units(record.conversion_value)?,
            currency: record.currency.clone(),
            order_id: record.order_id.clone(),
            transaction_id: record.transaction_id.clone(),
            dedupe_key: record.dedupe_key().map(str::to_string),
            attribution_model: record.attribution_model.clone(),
            verification_method: record.verification_method.clone(),
            is_verified: to_flag(record.is_verified),
            custom_data: serde_json::to_string(&record.custom_data)?,
            converted_at: to_nanos(record.converted_at)?,
        })
    }

    /// Decodes the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored conversion type, payload or timestamp
    /// is invalid.
    pub fn into_record(self) -> Result<ConversionRecord, PersistenceError> {
        let conversion_type: ConversionType = ConversionType::from_str(&self.conversion_type)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
        Ok(ConversionRecord {
            conversion_id: self.conversion_id,
            click_id: self.click_id,
            campaign_id: CampaignId::new(&self.campaign_id),
            ad_group_id: AdGroupId::new(&self.ad_group_id),
            creative_id: CreativeId::new(&self.creative_id),
            conversion_type,
            conversion_value: from_units(self.conversion_value),
            currency: self.currency,
            order_id: self.order_id,
            transaction_id: self.transaction_id,
            attribution_model: self.attribution_model,
            verification_method: self.verification_method,
            is_verified: from_flag(self.is_verified),
            custom_data: serde_json::from_str(&self.custom_data)?,
            converted_at: from_nanos(self.converted_at)?,
        })
    }
}
