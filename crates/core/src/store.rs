// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Append-only storage for auctions, impressions, clicks and conversions.
//!
//! Natural keys make every write idempotent:
//!
//! - an auction is unique on its request id
//! - a click is unique on its impression id
//! - a conversion carrying an order or transaction id is unique on
//!   `(click_id, transaction_id or order_id)`
//!
//! A second write for an existing key returns [`InsertOutcome::Existing`] with
//! the stored row and changes nothing, so callers apply metrics only for
//! [`InsertOutcome::Created`].

use std::collections::HashMap;
use std::sync::Mutex;

use adserve_audit::AuctionRecord;
use adserve_domain::{
    AdGroupId, CampaignId, ClickPosition, ConversionType, CreativeId, PlacementId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::counters::CounterTarget;
use crate::error::CoreError;

/// One served ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpressionRecord {
    pub impression_id: String,
    pub auction_id: Option<String>,
    pub request_id: Option<String>,
    pub campaign_id: CampaignId,
    pub ad_group_id: AdGroupId,
    pub creative_id: CreativeId,
    pub placement_id: PlacementId,
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
    /// The winner's own bid.
    pub bid_amount: Decimal,
    /// The clearing price at serve time.
    pub cost: Decimal,
    /// What the ledger actually accepted for this impression.
    pub billed_amount: Decimal,
    pub viewable: bool,
    pub view_duration_ms: u64,
    pub scroll_depth: Option<Decimal>,
    #[serde(with = "time::serde::rfc3339")]
    pub served_at: OffsetDateTime,
}

impl ImpressionRecord {
    /// The counters this impression rolls up into.
    #[must_use]
    pub fn counter_target(&self) -> CounterTarget {
        CounterTarget {
            campaign_id: self.campaign_id.clone(),
            ad_group_id: self.ad_group_id.clone(),
            creative_id: self.creative_id.clone(),
        }
    }
}

/// A client viewability report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewabilityUpdate {
    pub viewable: bool,
    pub view_duration_ms: u64,
    pub scroll_depth: Option<Decimal>,
}

/// A click on an impression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub click_id: String,
    pub impression_id: String,
    pub campaign_id: CampaignId,
    pub ad_group_id: AdGroupId,
    pub creative_id: CreativeId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub destination_url: String,
    pub click_position: Option<ClickPosition>,
    /// Seconds between serve and click.
    pub time_to_click: Decimal,
    pub is_valid: bool,
    pub fraud_score: Decimal,
    pub fraud_reason: String,
    /// What the ledger accepted for this click; zero for invalid clicks.
    pub cost: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub clicked_at: OffsetDateTime,
}

impl ClickRecord {
    /// The counters this click rolls up into.
    #[must_use]
    pub fn counter_target(&self) -> CounterTarget {
        CounterTarget {
            campaign_id: self.campaign_id.clone(),
            ad_group_id: self.ad_group_id.clone(),
            creative_id: self.creative_id.clone(),
        }
    }
}

/// A conversion attributed to a click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub conversion_id: String,
    pub click_id: String,
    pub campaign_id: CampaignId,
    pub ad_group_id: AdGroupId,
    pub creative_id: CreativeId,
    pub conversion_type: ConversionType,
    pub conversion_value: Decimal,
    pub currency: String,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub attribution_model: String,
    pub verification_method: Option<String>,
    pub is_verified: bool,
    pub custom_data: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub converted_at: OffsetDateTime,
}

impl ConversionRecord {
    /// The idempotency key within the click: transaction id, else order id.
    #[must_use]
    pub fn dedupe_key(&self) -> Option<&str> {
        self.transaction_id
            .as_deref()
            .or(self.order_id.as_deref())
    }

    /// The counters this conversion rolls up into.
    #[must_use]
    pub fn counter_target(&self) -> CounterTarget {
        CounterTarget {
            campaign_id: self.campaign_id.clone(),
            ad_group_id: self.ad_group_id.clone(),
            creative_id: self.creative_id.clone(),
        }
    }
}

/// Result of an idempotent insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// The row was written.
    Created(T),
    /// A row with the same natural key already existed; it is returned as stored.
    Existing(T),
}

impl<T> InsertOutcome<T> {
    /// Returns true if this call wrote the row.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Returns the row, whichever way it was obtained.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Created(value) | Self::Existing(value) => value,
        }
    }
}

/// Rows removed by a corrective deletion, for counter reversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoidedEvents {
    pub impression: Option<ImpressionRecord>,
    pub click: Option<ClickRecord>,
    pub conversions: Vec<ConversionRecord>,
}

/// Storage for serving events.
#[allow(clippy::missing_errors_doc)]
pub trait EventStore: Send + Sync {
    /// Writes an auction record, together with its impression when a winner
    /// was served, as one unit. Unique on `request_id`.
    fn insert_auction(
        &self,
        record: &AuctionRecord,
        impression: Option<&ImpressionRecord>,
    ) -> Result<InsertOutcome<AuctionRecord>, CoreError>;

    fn auction_by_request_id(&self, request_id: &str) -> Result<Option<AuctionRecord>, CoreError>;

    fn impression(&self, impression_id: &str) -> Result<Option<ImpressionRecord>, CoreError>;

    fn impression_for_auction(
        &self,
        auction_id: &str,
    ) -> Result<Option<ImpressionRecord>, CoreError>;

    fn set_impression_billed(&self, impression_id: &str, amount: Decimal)
    -> Result<(), CoreError>;

    /// Applies a viewability report; `None` if the impression does not exist.
    fn update_viewability(
        &self,
        impression_id: &str,
        update: &ViewabilityUpdate,
    ) -> Result<Option<ImpressionRecord>, CoreError>;

    /// Writes a click. Unique on `impression_id`.
    fn insert_click(&self, click: &ClickRecord) -> Result<InsertOutcome<ClickRecord>, CoreError>;

    fn click(&self, click_id: &str) -> Result<Option<ClickRecord>, CoreError>;

    fn set_click_cost(&self, click_id: &str, amount: Decimal) -> Result<(), CoreError>;

    /// Counts clicks recorded from `ip_address` at or after `since`.
    fn count_clicks_from_ip_since(
        &self,
        ip_address: &str,
        since: OffsetDateTime,
    ) -> Result<u32, CoreError>;

    /// Writes a conversion. Unique on `(click_id, dedupe_key)` when a dedupe key is present.
    fn insert_conversion(
        &self,
        conversion: &ConversionRecord,
    ) -> Result<InsertOutcome<ConversionRecord>, CoreError>;

    fn conversion(&self, conversion_id: &str) -> Result<Option<ConversionRecord>, CoreError>;

    /// Deletes a conversion.
    fn delete_conversion(&self, conversion_id: &str) -> Result<VoidedEvents, CoreError>;

    /// Deletes a click and its conversions.
    fn delete_click(&self, click_id: &str) -> Result<VoidedEvents, CoreError>;

    /// Deletes an impression, its click and that click's conversions.
    fn delete_impression(&self, impression_id: &str) -> Result<VoidedEvents, CoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    auctions: HashMap<String, AuctionRecord>,
    impressions: HashMap<String, ImpressionRecord>,
    clicks: HashMap<String, ClickRecord>,
    conversions: HashMap<String, ConversionRecord>,
}

impl Tables {
    fn click_for_impression(&self, impression_id: &str) -> Option<&ClickRecord> {
        self.clicks
            .values()
            .find(|click| click.impression_id == impression_id)
    }

    fn remove_conversions_for_click(&mut self, click_id: &str) -> Vec<ConversionRecord> {
        let ids: Vec<String> = self
            .conversions
            .values()
            .filter(|conversion| conversion.click_id == click_id)
            .map(|conversion| conversion.conversion_id.clone())
            .collect();
        ids.iter()
            .filter_map(|id| self.conversions.remove(id))
            .collect()
    }
}

/// Event storage held in process memory behind one mutex.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    tables: Mutex<Tables>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, CoreError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| CoreError::LockPoisoned("event store"))?;
        Ok(f(&mut tables))
    }
}

impl EventStore for InMemoryEventStore {
    fn insert_auction(
        &self,
        record: &AuctionRecord,
        impression: Option<&ImpressionRecord>,
    ) -> Result<InsertOutcome<AuctionRecord>, CoreError> {
        self.with_tables(|tables| {
            if let Some(existing) = tables.auctions.get(&record.request_id) {
                return InsertOutcome::Existing(existing.clone());
            }
            tables
                .auctions
                .insert(record.request_id.clone(), record.clone());
            if let Some(impression) = impression {
                tables
                    .impressions
                    .insert(impression.impression_id.clone(), impression.clone());
            }
            InsertOutcome::Created(record.clone())
        })
    }

    fn auction_by_request_id(&self, request_id: &str) -> Result<Option<AuctionRecord>, CoreError> {
        self.with_tables(|tables| tables.auctions.get(request_id).cloned())
    }

    fn impression(&self, impression_id: &str) -> Result<Option<ImpressionRecord>, CoreError> {
        self.with_tables(|tables| tables.impressions.get(impression_id).cloned())
    }

    fn impression_for_auction(
        &self,
        auction_id: &str,
    ) -> Result<Option<ImpressionRecord>, CoreError> {
        self.with_tables(|tables| {
            tables
                .impressions
                .values()
                .find(|impression| impression.auction_id.as_deref() == Some(auction_id))
                .cloned()
        })
    }

    fn set_impression_billed(
        &self,
        impression_id: &str,
        amount: Decimal,
    ) -> Result<(), CoreError> {
        self.with_tables(|tables| {
            tables
                .impressions
                .get_mut(impression_id)
                .map(|impression| impression.billed_amount = amount)
                .ok_or_else(|| CoreError::ImpressionNotFound(impression_id.to_string()))
        })?
    }

    fn update_viewability(
        &self,
        impression_id: &str,
        update: &ViewabilityUpdate,
    ) -> Result<Option<ImpressionRecord>, CoreError> {
        self.with_tables(|tables| {
            tables.impressions.get_mut(impression_id).map(|impression| {
                impression.viewable = update.viewable;
                impression.view_duration_ms = update.view_duration_ms;
                impression.scroll_depth = update.scroll_depth;
                impression.clone()
            })
        })
    }

    fn insert_click(&self, click: &ClickRecord) -> Result<InsertOutcome<ClickRecord>, CoreError> {
        self.with_tables(|tables| {
            if !tables.impressions.contains_key(&click.impression_id) {
                return Err(CoreError::ImpressionNotFound(click.impression_id.clone()));
            }
            if let Some(existing) = tables.click_for_impression(&click.impression_id) {
                return Ok(InsertOutcome::Existing(existing.clone()));
            }
            tables.clicks.insert(click.click_id.clone(), click.clone());
            Ok(InsertOutcome::Created(click.clone()))
        })?
    }

    fn click(&self, click_id: &str) -> Result<Option<ClickRecord>, CoreError> {
        self.with_tables(|tables| tables.clicks.get(click_id).cloned())
    }

    fn set_click_cost(&self, click_id: &str, amount: Decimal) -> Result<(), CoreError> {
        self.with_tables(|tables| {
            tables
                .clicks
                .get_mut(click_id)
                .map(|click| click.cost = amount)
                .ok_or_else(|| CoreError::ClickNotFound(click_id.to_string()))
        })?
    }

    fn count_clicks_from_ip_since(
        &self,
        ip_address: &str,
        since: OffsetDateTime,
    ) -> Result<u32, CoreError> {
        self.with_tables(|tables| {
            let count: usize = tables
                .clicks
                .values()
                .filter(|click| {
                    click.ip_address.as_deref() == Some(ip_address) && click.clicked_at >= since
                })
                .count();
            u32::try_from(count).unwrap_or(u32::MAX)
        })
    }

    fn insert_conversion(
        &self,
        conversion: &ConversionRecord,
    ) -> Result<InsertOutcome<ConversionRecord>, CoreError> {
        self.with_tables(|tables| {
            if !tables.clicks.contains_key(&conversion.click_id) {
                return Err(CoreError::ClickNotFound(conversion.click_id.clone()));
            }
            if let Some(key) = conversion.dedupe_key()
                && let Some(existing) = tables.conversions.values().find(|stored| {
                    stored.click_id == conversion.click_id && stored.dedupe_key() == Some(key)
                })
            {
                return Ok(InsertOutcome::Existing(existing.clone()));
            }
            tables
                .conversions
                .insert(conversion.conversion_id.clone(), conversion.clone());
            Ok(InsertOutcome::Created(conversion.clone()))
        })?
    }

    fn conversion(&self, conversion_id: &str) -> Result<Option<ConversionRecord>, CoreError> {
        self.with_tables(|tables| tables.conversions.get(conversion_id).cloned())
    }

    fn delete_conversion(&self, conversion_id: &str) -> Result<VoidedEvents, CoreError> {
        self.with_tables(|tables| VoidedEvents {
            conversions: tables.conversions.remove(conversion_id).into_iter().collect(),
            ..VoidedEvents::default()
        })
    }

    fn delete_click(&self, click_id: &str) -> Result<VoidedEvents, CoreError> {
        self.with_tables(|tables| {
            let click: Option<ClickRecord> = tables.clicks.remove(click_id);
            let conversions: Vec<ConversionRecord> = if click.is_some() {
                tables.remove_conversions_for_click(click_id)
            } else {
                Vec::new()
            };
            VoidedEvents {
                impression: None,
                click,
                conversions,
            }
        })
    }

    fn delete_impression(&self, impression_id: &str) -> Result<VoidedEvents, CoreError> {
        self.with_tables(|tables| {
            let Some(impression) = tables.impressions.remove(impression_id) else {
                return VoidedEvents::default();
            };
            let click_id: Option<String> = tables
                .click_for_impression(impression_id)
                .map(|click| click.click_id.clone());
            let click: Option<ClickRecord> =
                click_id.as_deref().and_then(|id| tables.clicks.remove(id));
            let conversions: Vec<ConversionRecord> = click_id
                .as_deref()
                .map(|id| tables.remove_conversions_for_click(id))
                .unwrap_or_default();
            VoidedEvents {
                impression: Some(impression),
                click,
                conversions,
            }
        })
    }
}
